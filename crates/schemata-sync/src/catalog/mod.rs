//! Index catalog: the declared index set of every managed table
//!
//! The catalog is built once at startup and read-only afterwards. It holds
//! two kinds of entries:
//!
//! - system tables, keyed by their fixed name
//! - the instance and association *families*, applied to every object's
//!   `cc_ObjectBase_{id}` and `cc_InstAsst_{id}` tables
//!
//! Each entry carries the current descriptors and the deprecated names that
//! must be removed wherever they are still live.

mod collections;

use std::collections::BTreeMap;

use schemata_core::{IndexDescriptor, ManagedPrefixes};

use crate::error::CatalogError;

pub use collections::{Declaration, association_family, instance_family, system_tables};

/// Declared indexes of one table or table family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableIndexes {
    /// Indexes that must exist
    pub current: Vec<IndexDescriptor>,
    /// Names to drop when live
    pub deprecated: Vec<String>,
}

impl TableIndexes {
    pub fn current(&self) -> &[IndexDescriptor] {
        &self.current
    }

    pub fn deprecated(&self) -> &[String] {
        &self.deprecated
    }

    fn register(
        &mut self,
        table: &str,
        prefixes: &ManagedPrefixes,
        deprecated: Vec<IndexDescriptor>,
        current: Vec<IndexDescriptor>,
    ) -> Result<(), CatalogError> {
        // Validate everything before touching the entry
        let mut seen: Vec<&str> = self.current.iter().map(|i| i.name.as_str()).collect();
        for index in &current {
            if !prefixes.is_managed(&index.name) {
                return Err(CatalogError::UnmanagedName {
                    table: table.to_string(),
                    name: index.name.clone(),
                });
            }
            if index.keys.is_empty() {
                return Err(CatalogError::EmptyKeys {
                    table: table.to_string(),
                    name: index.name.clone(),
                });
            }
            if seen.contains(&index.name.as_str()) {
                return Err(CatalogError::DuplicateIndex {
                    table: table.to_string(),
                    name: index.name.clone(),
                });
            }
            seen.push(&index.name);
        }

        self.current.extend(current);
        for index in deprecated {
            if !self.deprecated.contains(&index.name) {
                self.deprecated.push(index.name);
            }
        }
        Ok(())
    }
}

/// Declared index sets of all managed tables
#[derive(Debug, Clone, Default)]
pub struct IndexCatalog {
    prefixes: ManagedPrefixes,
    tables: BTreeMap<String, TableIndexes>,
    instance: TableIndexes,
    association: TableIndexes,
}

impl IndexCatalog {
    /// Create an empty catalog
    pub fn new(prefixes: ManagedPrefixes) -> Self {
        Self {
            prefixes,
            ..Self::default()
        }
    }

    /// Catalog with the shipped system tables and object families
    pub fn standard(prefixes: ManagedPrefixes) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(prefixes);

        for (table, entry) in system_tables(&catalog.prefixes) {
            catalog.register(table, entry.deprecated, entry.current)?;
        }
        let instance = instance_family(&catalog.prefixes);
        catalog.register_instance_family(instance.deprecated, instance.current)?;
        let association = association_family(&catalog.prefixes);
        catalog.register_association_family(association.deprecated, association.current)?;

        Ok(catalog)
    }

    pub fn prefixes(&self) -> &ManagedPrefixes {
        &self.prefixes
    }

    /// Register deprecated and current indexes of a system table
    ///
    /// Repeated registrations for the same table accumulate. Current names
    /// must carry a managed prefix, have keys, and be unique in the table.
    pub fn register(
        &mut self,
        table: &str,
        deprecated: Vec<IndexDescriptor>,
        current: Vec<IndexDescriptor>,
    ) -> Result<(), CatalogError> {
        if table.is_empty() {
            return Err(CatalogError::EmptyTable);
        }
        let mut entry = self.tables.get(table).cloned().unwrap_or_default();
        entry.register(table, &self.prefixes, deprecated, current)?;
        self.tables.insert(table.to_string(), entry);
        Ok(())
    }

    /// Register indexes of every object's instance table
    pub fn register_instance_family(
        &mut self,
        deprecated: Vec<IndexDescriptor>,
        current: Vec<IndexDescriptor>,
    ) -> Result<(), CatalogError> {
        self.instance
            .register("cc_ObjectBase_*", &self.prefixes, deprecated, current)
    }

    /// Register indexes of every object's association table
    pub fn register_association_family(
        &mut self,
        deprecated: Vec<IndexDescriptor>,
        current: Vec<IndexDescriptor>,
    ) -> Result<(), CatalogError> {
        self.association
            .register("cc_InstAsst_*", &self.prefixes, deprecated, current)
    }

    /// System tables in name order
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableIndexes)> {
        self.tables.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn table(&self, name: &str) -> Option<&TableIndexes> {
        self.tables.get(name)
    }

    pub fn instance_family(&self) -> &TableIndexes {
        &self.instance
    }

    pub fn association_family(&self) -> &TableIndexes {
        &self.association
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemata_core::{
        TABLE_HOST_BASE, TABLE_OBJECT_ATTRIBUTES, TABLE_OBJECT_DESCRIPTIONS,
        TABLE_OBJECT_UNIQUES, TABLE_SET_TEMPLATE_SYNC_STATUS,
    };

    fn idx(name: &str) -> IndexDescriptor {
        IndexDescriptor::new(name).asc("f1")
    }

    #[test]
    fn test_register_accumulates() {
        let mut catalog = IndexCatalog::new(ManagedPrefixes::default());
        catalog
            .register("cc_Demo", vec![idx("idx_old")], vec![idx("bkcc_idx_a")])
            .unwrap();
        catalog
            .register("cc_Demo", vec![idx("idx_old")], vec![idx("bkcc_idx_b")])
            .unwrap();

        let entry = catalog.table("cc_Demo").unwrap();
        assert_eq!(entry.current().len(), 2);
        assert_eq!(entry.deprecated(), ["idx_old".to_string()]);
    }

    #[test]
    fn test_register_rejects_unmanaged_name() {
        let mut catalog = IndexCatalog::new(ManagedPrefixes::default());
        let err = catalog
            .register("cc_Demo", vec![], vec![idx("idx_plain")])
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnmanagedName { .. }));
        assert!(catalog.table("cc_Demo").is_none());
    }

    #[test]
    fn test_register_rejects_duplicates_across_calls() {
        let mut catalog = IndexCatalog::new(ManagedPrefixes::default());
        catalog.register("cc_Demo", vec![], vec![idx("bkcc_idx_a")]).unwrap();
        let err = catalog
            .register("cc_Demo", vec![], vec![idx("bkcc_idx_a")])
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateIndex { .. }));
        assert_eq!(catalog.table("cc_Demo").unwrap().current().len(), 1);
    }

    #[test]
    fn test_register_rejects_empty_keys_and_table() {
        let mut catalog = IndexCatalog::new(ManagedPrefixes::default());
        let err = catalog
            .register("cc_Demo", vec![], vec![IndexDescriptor::new("bkcc_idx_a")])
            .unwrap_err();
        assert!(matches!(err, CatalogError::EmptyKeys { .. }));

        let err = catalog.register("", vec![], vec![]).unwrap_err();
        assert_eq!(err, CatalogError::EmptyTable);
    }

    #[test]
    fn test_standard_catalog() {
        let catalog = IndexCatalog::standard(ManagedPrefixes::default()).unwrap();

        let names: Vec<&str> = catalog.tables().map(|(name, _)| name).collect();
        for table in [
            TABLE_HOST_BASE,
            TABLE_OBJECT_ATTRIBUTES,
            TABLE_OBJECT_DESCRIPTIONS,
            TABLE_OBJECT_UNIQUES,
            TABLE_SET_TEMPLATE_SYNC_STATUS,
        ] {
            assert!(names.contains(&table), "missing {table}");
        }

        let status = catalog.table(TABLE_SET_TEMPLATE_SYNC_STATUS).unwrap();
        assert!(status.current().is_empty());
        assert!(status.deprecated().contains(&"idx_taskID".to_string()));

        assert!(
            catalog
                .instance_family()
                .current()
                .iter()
                .any(|i| i.name == "bkcc_idx_InstId" && i.unique)
        );
        assert!(!catalog.association_family().current().is_empty());
    }

    #[test]
    fn test_standard_catalog_follows_prefixes() {
        let prefixes = ManagedPrefixes::new("x_idx_", "x_unique_");
        let catalog = IndexCatalog::standard(prefixes).unwrap();
        assert!(
            catalog
                .instance_family()
                .current()
                .iter()
                .all(|i| i.name.starts_with("x_idx_"))
        );
    }
}
