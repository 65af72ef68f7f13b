//! Collaborator traits consumed by the reconciler
//!
//! - [`DocumentStore`]: the physical document store (tables and indexes)
//! - [`ModelStore`]: read access to model definitions
//! - [`LeadershipOracle`]: whether this replica may run reconciliation
//!
//! Drivers are expected to apply their own timeouts; none of these calls
//! should block indefinitely.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::index::IndexDescriptor;
use crate::model::{Attribute, ObjectFilter, ObjectRecord, UniqueConstraint};

/// A stored document
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Table and index operations on the physical store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of all tables
    async fn list_tables(&self) -> Result<Vec<String>, StoreError>;

    /// Create an empty table
    async fn create_table(&self, table: &str) -> Result<(), StoreError>;

    /// Drop a table and everything in it
    async fn drop_table(&self, table: &str) -> Result<(), StoreError>;

    /// Whether the table exists
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError>;

    /// Live indexes of a table
    async fn list_indexes(&self, table: &str) -> Result<Vec<IndexDescriptor>, StoreError>;

    /// Create one index
    async fn create_index(&self, table: &str, index: &IndexDescriptor) -> Result<(), StoreError>;

    /// Drop an index by name
    ///
    /// # Errors
    ///
    /// Must return [`StoreError::IndexNotFound`] when no index has that name.
    async fn drop_index(&self, table: &str, name: &str) -> Result<(), StoreError>;

    /// Any one document of the table
    ///
    /// # Errors
    ///
    /// Must return [`StoreError::NotFound`] when the table holds no document.
    async fn find_one(&self, table: &str) -> Result<Document, StoreError>;
}

/// Read-only access to model definitions
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Objects matching the filter, in store order
    async fn list_objects(&self, filter: ObjectFilter) -> Result<Vec<ObjectRecord>, StoreError>;

    /// Attributes of an object, projected to id, property id and property type
    async fn list_attributes(&self, object_id: &str) -> Result<Vec<Attribute>, StoreError>;

    /// Unique constraints declared on an object
    async fn list_unique_constraints(
        &self,
        object_id: &str,
    ) -> Result<Vec<UniqueConstraint>, StoreError>;
}

/// Leadership check for multi-replica deployments
#[async_trait]
pub trait LeadershipOracle: Send + Sync {
    /// True if this replica currently holds leadership
    async fn is_leader(&self) -> bool;
}

/// Leadership oracle backed by a flag
///
/// A standalone deployment is always the leader. Tests flip the flag to
/// simulate leadership changes.
#[derive(Debug)]
pub struct StaticLeadership {
    leader: AtomicBool,
}

impl StaticLeadership {
    /// Oracle that always reports leadership
    pub fn standalone() -> Self {
        Self::new(true)
    }

    pub fn new(leader: bool) -> Self {
        Self {
            leader: AtomicBool::new(leader),
        }
    }

    /// Change the reported leadership
    pub fn set_leader(&self, leader: bool) {
        self.leader.store(leader, Ordering::SeqCst);
    }
}

impl Default for StaticLeadership {
    fn default() -> Self {
        Self::standalone()
    }
}

#[async_trait]
impl LeadershipOracle for StaticLeadership {
    async fn is_leader(&self) -> bool {
        self.leader.load(Ordering::SeqCst)
    }
}
