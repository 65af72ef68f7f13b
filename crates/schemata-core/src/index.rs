//! Physical index descriptors and managed-index naming
//!
//! An [`IndexDescriptor`] is what the document store reports for a live
//! index and what the catalog declares for a desired one. Reconciliation
//! compares descriptors with [`IndexDescriptor::is_equivalent`], which looks
//! only at the ordered key specification and the uniqueness flag: during a
//! rename the same definition may legitimately exist under two names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name prefix of reconciler-managed structural indexes
pub const LOGIC_INDEX_PREFIX: &str = "bkcc_idx_";

/// Name prefix of reconciler-managed uniqueness indexes
pub const UNIQUE_INDEX_PREFIX: &str = "bkcc_unique_";

/// Sort direction of one index key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl From<SortDirection> for i32 {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

impl TryFrom<i32> for SortDirection {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ascending),
            -1 => Ok(Self::Descending),
            other => Err(format!("invalid sort direction {other}, expected 1 or -1")),
        }
    }
}

/// One `field -> direction` entry of a key specification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexKey {
    pub field: String,
    pub direction: SortDirection,
}

impl IndexKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, i32::from(self.direction))
    }
}

/// A physical index on one table
///
/// Key order is significant: `{a:1, b:1}` and `{b:1, a:1}` are different
/// compound indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name, unique per table
    pub name: String,
    /// Ordered key specification
    pub keys: Vec<IndexKey>,
    /// Enforce uniqueness over the key tuple
    #[serde(default)]
    pub unique: bool,
    /// Build without blocking writers
    #[serde(default)]
    pub background: bool,
}

impl IndexDescriptor {
    /// Create an empty, non-unique, background index named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            unique: false,
            background: true,
        }
    }

    /// Append an ascending key
    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push(IndexKey::new(field, SortDirection::Ascending));
        self
    }

    /// Append a descending key
    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push(IndexKey::new(field, SortDirection::Descending));
        self
    }

    /// Append a key with an explicit direction
    pub fn key(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push(IndexKey::new(field, direction));
        self
    }

    /// Mark the index unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the background build hint
    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// Same ordered keys and same uniqueness; name and build hint ignored
    pub fn is_equivalent(&self, other: &IndexDescriptor) -> bool {
        self.unique == other.unique && self.keys == other.keys
    }

    /// Render the key specification as `{f1:1, f2:-1}`
    pub fn key_spec(&self) -> String {
        let keys: Vec<String> = self.keys.iter().map(ToString::to_string).collect();
        format!("{{{}}}", keys.join(", "))
    }
}

impl fmt::Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.key_spec())?;
        if self.unique {
            write!(f, " unique")?;
        }
        Ok(())
    }
}

/// The naming convention that marks indexes as owned by the reconciler
///
/// Every code path that decides whether a live index may be deleted goes
/// through this predicate. Indexes matching neither prefix are unmanaged and
/// are never dropped unless listed as deprecated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedPrefixes {
    /// Prefix of structural indexes
    pub logic: String,
    /// Prefix of uniqueness indexes
    pub unique: String,
}

impl Default for ManagedPrefixes {
    fn default() -> Self {
        Self {
            logic: LOGIC_INDEX_PREFIX.to_string(),
            unique: UNIQUE_INDEX_PREFIX.to_string(),
        }
    }
}

impl ManagedPrefixes {
    pub fn new(logic: impl Into<String>, unique: impl Into<String>) -> Self {
        Self {
            logic: logic.into(),
            unique: unique.into(),
        }
    }

    /// True if `name` carries the structural prefix
    pub fn is_logic(&self, name: &str) -> bool {
        name.starts_with(&self.logic)
    }

    /// True if `name` carries the uniqueness prefix
    pub fn is_unique(&self, name: &str) -> bool {
        name.starts_with(&self.unique)
    }

    /// True if `name` carries either managed prefix
    pub fn is_managed(&self, name: &str) -> bool {
        self.is_logic(name) || self.is_unique(name)
    }

    /// True if a live index named `name` is a deletion candidate
    ///
    /// Unique-prefixed indexes only qualify when the caller knows the full
    /// set of desired unique indexes for the table.
    pub fn owns(&self, name: &str, unique_aware: bool) -> bool {
        self.is_logic(name) || (unique_aware && self.is_unique(name))
    }

    /// Name of the uniqueness index derived from a constraint id
    pub fn unique_index_name(&self, constraint_id: u64) -> String {
        format!("{}{}", self.unique, constraint_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalence_ignores_name_and_background() {
        let a = IndexDescriptor::new("bkcc_idx_a").asc("f1");
        let b = IndexDescriptor::new("idx_legacy").asc("f1").with_background(false);
        assert!(a.is_equivalent(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_equivalence_respects_key_order() {
        let a = IndexDescriptor::new("i").asc("f1").asc("f2");
        let b = IndexDescriptor::new("i").asc("f2").asc("f1");
        assert!(!a.is_equivalent(&b));
    }

    #[test]
    fn test_equivalence_respects_direction_and_uniqueness() {
        let base = IndexDescriptor::new("i").asc("f1");
        assert!(!base.is_equivalent(&IndexDescriptor::new("i").desc("f1")));
        assert!(!base.is_equivalent(&IndexDescriptor::new("i").asc("f1").unique()));
    }

    #[test]
    fn test_key_spec_rendering() {
        let idx = IndexDescriptor::new("idx_b").asc("f1").desc("f2").unique();
        assert_eq!(idx.key_spec(), "{f1:1, f2:-1}");
        assert_eq!(idx.to_string(), "idx_b {f1:1, f2:-1} unique");
    }

    #[test]
    fn test_sort_direction_serde() {
        let idx = IndexDescriptor::new("i").desc("f");
        let json = serde_json::to_string(&idx).unwrap();
        assert!(json.contains("\"direction\":-1"));

        let parsed: IndexDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, idx);

        assert!(SortDirection::try_from(2).is_err());
    }

    #[test]
    fn test_managed_prefixes() {
        let prefixes = ManagedPrefixes::default();
        assert!(prefixes.owns("bkcc_idx_ObjId", false));
        assert!(!prefixes.owns("bkcc_unique_7", false));
        assert!(prefixes.owns("bkcc_unique_7", true));
        assert!(!prefixes.owns("_id_", true));
        assert!(!prefixes.is_managed("idx_taskID"));
        assert_eq!(prefixes.unique_index_name(42), "bkcc_unique_42");
    }
}
