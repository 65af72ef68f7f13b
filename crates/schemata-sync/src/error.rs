//! Error types for catalog registration, unique translation, reconciliation
//! and the cycle-level sync steps

use schemata_core::StoreError;
use thiserror::Error;

use crate::report::Severity;

/// Rejected catalog registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Index {name} on {table} does not carry a managed prefix")]
    UnmanagedName { table: String, name: String },

    #[error("Index {name} registered twice on {table}")]
    DuplicateIndex { table: String, name: String },

    #[error("Index {name} on {table} has no keys")]
    EmptyKeys { table: String, name: String },

    #[error("Table name must not be empty")]
    EmptyTable,
}

/// Failure to turn an object's unique constraints into index descriptors
///
/// Any of these fails the whole object: a partial set of unique indexes
/// would make the reconciler drop the ones it could not derive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("Failed to list unique constraints of {object_id}: {source}")]
    ListConstraints {
        object_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to list attributes of {object_id}: {source}")]
    ListAttributes {
        object_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Unique constraint {constraint_id} of {object_id} has no keys")]
    EmptyConstraint { object_id: String, constraint_id: u64 },

    #[error("Unique constraint {constraint_id} of {object_id}: unsupported kind of key {key_id}")]
    UnsupportedKeyKind {
        object_id: String,
        constraint_id: u64,
        key_id: u64,
    },

    #[error("Unique constraint {constraint_id} of {object_id}: unknown attribute {attribute_id}")]
    UnresolvedAttribute {
        object_id: String,
        constraint_id: u64,
        attribute_id: u64,
    },

    #[error("Unique constraint {constraint_id} of {object_id} lists field {field} twice")]
    DuplicateField {
        object_id: String,
        constraint_id: u64,
        field: String,
    },
}

/// Failure that aborts the reconciliation of one table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("Failed to list indexes of {table}: {source}")]
    ListIndexes {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to drop index {name} on {table}: {source}")]
    DropIndex {
        table: String,
        name: String,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    /// Tier under which the enclosing scope records this failure
    pub fn severity(&self) -> Severity {
        match self {
            Self::ListIndexes { .. } => Severity::Hard,
            Self::DropIndex { .. } => Severity::Degraded,
        }
    }
}

/// Failure that aborts a whole sync step of a cycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Failed to list tables: {0}")]
    ListTables(#[source] StoreError),

    #[error("Failed to list objects: {0}")]
    ListObjects(#[source] StoreError),
}
