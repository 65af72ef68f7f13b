//! In-memory document store
//!
//! Behaves like a document database as far as the reconciler can observe:
//! new tables carry the implicit `_id_` index, dropping a missing index
//! yields [`StoreError::IndexNotFound`], and `find_one` on an empty table
//! yields [`StoreError::NotFound`].
//!
//! Every mutating call is appended to a journal before it is applied, so
//! tests can assert on the exact create/drop calls a reconciliation pass
//! issued, including the ones that failed.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;
use schemata_core::{Document, DocumentStore, IndexDescriptor, StoreError};
use tracing::{debug, trace};

/// Name of the index every table gets on creation
pub const PRIMARY_INDEX_NAME: &str = "_id_";

/// A mutating call recorded in the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    CreateTable(String),
    DropTable(String),
    CreateIndex { table: String, name: String },
    DropIndex { table: String, name: String },
}

impl StoreOperation {
    /// True for index creations and drops
    pub fn is_index_mutation(&self) -> bool {
        matches!(self, Self::CreateIndex { .. } | Self::DropIndex { .. })
    }
}

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    ListTables,
    CreateTable,
    DropTable,
    ListIndexes,
    CreateIndex,
    DropIndex,
    FindOne,
}

/// Target wildcard for [`InMemoryDocumentStore::inject_fault`]
pub const ANY_TARGET: &str = "*";

#[derive(Debug)]
struct TableState {
    indexes: Vec<IndexDescriptor>,
    documents: Vec<Document>,
}

impl TableState {
    fn new() -> Self {
        Self {
            indexes: vec![
                IndexDescriptor::new(PRIMARY_INDEX_NAME)
                    .asc("_id")
                    .with_background(false),
            ],
            documents: Vec::new(),
        }
    }
}

/// In-memory implementation of [`DocumentStore`]
///
/// Uses `DashMap` for concurrent access to tables. Index names are unique
/// per table; two indexes with equivalent keys under different names are
/// accepted.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    tables: DashMap<String, TableState>,
    /// Faults keyed by operation and target (table, or `table/index` for index ops)
    faults: DashMap<(FaultOp, String), StoreError>,
    journal: Mutex<Vec<StoreOperation>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table directly, without journaling
    pub fn seed_table(&self, table: &str) {
        self.tables.entry(table.to_string()).or_insert_with(TableState::new);
    }

    /// Install an index directly, without journaling or conflict checks
    pub fn seed_index(&self, table: &str, index: IndexDescriptor) {
        let mut state = self.tables.entry(table.to_string()).or_insert_with(TableState::new);
        state.indexes.retain(|existing| existing.name != index.name);
        state.indexes.push(index);
    }

    /// Insert a document, creating the table if needed
    pub fn insert_document(&self, table: &str, document: Document) {
        self.tables
            .entry(table.to_string())
            .or_insert_with(TableState::new)
            .documents
            .push(document);
    }

    /// Make every matching call fail with `error` until cleared
    ///
    /// `target` is a table name, `table/index` for index operations, or
    /// [`ANY_TARGET`].
    pub fn inject_fault(&self, op: FaultOp, target: impl Into<String>, error: StoreError) {
        self.faults.insert((op, target.into()), error);
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        self.faults.clear();
    }

    /// All journaled calls, oldest first
    pub fn journal(&self) -> Vec<StoreOperation> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forget journaled calls
    pub fn clear_journal(&self) {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Snapshot of a table's indexes, if the table exists
    pub fn indexes_of(&self, table: &str) -> Option<Vec<IndexDescriptor>> {
        self.tables.get(table).map(|state| state.indexes.clone())
    }

    /// Index names of a table, sorted
    pub fn index_names(&self, table: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .indexes_of(table)
            .unwrap_or_default()
            .into_iter()
            .map(|index| index.name)
            .collect();
        names.sort();
        names
    }

    /// Whether a table exists, without going through the trait
    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Number of documents in a table
    pub fn document_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |state| state.documents.len())
    }

    fn record(&self, op: StoreOperation) {
        trace!(?op, "store call");
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).push(op);
    }

    fn check_fault(&self, op: FaultOp, target: &str) -> Result<(), StoreError> {
        if let Some(error) = self.faults.get(&(op, target.to_string())) {
            return Err(error.value().clone());
        }
        if let Some(error) = self.faults.get(&(op, ANY_TARGET.to_string())) {
            return Err(error.value().clone());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        self.check_fault(FaultOp::ListTables, ANY_TARGET)?;
        let mut names: Vec<String> = self.tables.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn create_table(&self, table: &str) -> Result<(), StoreError> {
        self.record(StoreOperation::CreateTable(table.to_string()));
        self.check_fault(FaultOp::CreateTable, table)?;

        if self.tables.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        self.tables.insert(table.to_string(), TableState::new());
        debug!(table, "Created table");
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<(), StoreError> {
        self.record(StoreOperation::DropTable(table.to_string()));
        self.check_fault(FaultOp::DropTable, table)?;

        match self.tables.remove(table) {
            Some(_) => {
                debug!(table, "Dropped table");
                Ok(())
            }
            None => Err(StoreError::TableNotFound(table.to_string())),
        }
    }

    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.tables.contains_key(table))
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<IndexDescriptor>, StoreError> {
        self.check_fault(FaultOp::ListIndexes, table)?;
        self.indexes_of(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    async fn create_index(&self, table: &str, index: &IndexDescriptor) -> Result<(), StoreError> {
        self.record(StoreOperation::CreateIndex {
            table: table.to_string(),
            name: index.name.clone(),
        });
        self.check_fault(FaultOp::CreateIndex, &format!("{table}/{}", index.name))?;
        self.check_fault(FaultOp::CreateIndex, table)?;

        let mut state = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        if let Some(existing) = state.indexes.iter().find(|existing| existing.name == index.name) {
            if existing.is_equivalent(index) {
                return Ok(());
            }
            return Err(StoreError::IndexConflict {
                table: table.to_string(),
                reason: format!(
                    "index {} already exists with keys {}",
                    index.name,
                    existing.key_spec()
                ),
            });
        }

        state.indexes.push(index.clone());
        debug!(table, index = %index, "Created index");
        Ok(())
    }

    async fn drop_index(&self, table: &str, name: &str) -> Result<(), StoreError> {
        self.record(StoreOperation::DropIndex {
            table: table.to_string(),
            name: name.to_string(),
        });
        self.check_fault(FaultOp::DropIndex, &format!("{table}/{name}"))?;
        self.check_fault(FaultOp::DropIndex, table)?;

        let mut state = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let before = state.indexes.len();
        state.indexes.retain(|existing| existing.name != name);
        if state.indexes.len() == before {
            return Err(StoreError::index_not_found(table, name));
        }
        debug!(table, index = name, "Dropped index");
        Ok(())
    }

    async fn find_one(&self, table: &str) -> Result<Document, StoreError> {
        self.check_fault(FaultOp::FindOne, table)?;
        let state = self
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        state
            .documents
            .first()
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("no document in {table}")))
    }
}
