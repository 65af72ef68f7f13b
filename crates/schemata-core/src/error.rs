//! Error types for schemata

use thiserror::Error;

/// Errors returned by [`DocumentStore`](crate::DocumentStore) and
/// [`ModelStore`](crate::ModelStore) implementations
///
/// Drivers must map their native "missing" conditions onto the dedicated
/// variants so callers can tell a benign race apart from a real failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The named index does not exist on the table
    #[error("Index not found with name {name} on table {table}")]
    IndexNotFound { table: String, name: String },

    /// A lookup matched no document
    #[error("Not found: {0}")]
    NotFound(String),

    /// The table already exists
    #[error("Table already exists: {0}")]
    TableExists(String),

    /// An index with the same name or keys already exists
    #[error("Index conflict on table {table}: {reason}")]
    IndexConflict { table: String, reason: String },

    /// The operation did not complete in time
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a new NotFound error
    pub fn not_found(item: impl Into<String>) -> Self {
        Self::NotFound(item.into())
    }

    /// Create a new IndexNotFound error
    pub fn index_not_found(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::IndexNotFound {
            table: table.into(),
            name: name.into(),
        }
    }

    /// Create a new Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// True if a single-document lookup found nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True if a drop targeted an index that is already gone
    pub fn is_index_not_found(&self) -> bool {
        matches!(self, Self::IndexNotFound { .. })
    }

    /// True if the table does not exist
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, Self::TableNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = StoreError::not_found("cc_ObjectBase_x");
        assert!(err.is_not_found());
        assert!(!err.is_index_not_found());
        assert!(err.to_string().contains("cc_ObjectBase_x"));
    }

    #[test]
    fn test_index_not_found_classification() {
        let err = StoreError::index_not_found("cc_HostBase", "bkcc_idx_HostID");
        assert!(err.is_index_not_found());
        assert!(!err.is_not_found());
        assert!(err.to_string().starts_with("Index not found with name"));
    }

    #[test]
    fn test_backend_is_not_benign() {
        let err = StoreError::backend("connection reset");
        assert!(!err.is_not_found());
        assert!(!err.is_index_not_found());
        assert!(!err.is_table_not_found());
    }
}
