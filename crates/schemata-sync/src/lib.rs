//! # Schemata Sync
//!
//! Self-healing table and index reconciliation for a sharded document store.
//!
//! A leader-gated [`SyncTask`] periodically runs two steps:
//!
//! 1. **Table sharding** ([`ShardingManager`]): every object gets an instance
//!    table and an association table, their indexes are reconciled against
//!    the catalog families plus the object's unique constraints, and empty
//!    tables of deleted objects are dropped.
//! 2. **Catalog index sync** ([`IndexSync`]): every system table in the
//!    [`IndexCatalog`] is reconciled against its declared indexes.
//!
//! Only indexes carrying a managed prefix, or listed as deprecated, are ever
//! dropped. Everything else on a table is left alone.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use schemata_core::StaticLeadership;
//! use schemata_logging::SubscriberBuilder;
//! use schemata_sync::{SyncConfig, SyncTask};
//!
//! let config = SyncConfig::from_file("schemata.toml")?;
//! let _log_guard = SubscriberBuilder::new()
//!     .with_config(config.logging.clone())
//!     .init()?;
//!
//! let handle = SyncTask::standard(
//!     config,
//!     store,
//!     models,
//!     Arc::new(StaticLeadership::standalone()),
//! )?
//! .spawn();
//!
//! // On shutdown
//! handle.abort();
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod index_sync;
pub mod reconciler;
pub mod report;
pub mod sharding;
pub mod sync_task;
pub mod unique;

pub use catalog::{IndexCatalog, TableIndexes};
pub use config::{ConfigError, SyncConfig, UniqueFailurePolicy};
pub use error::{CatalogError, ReconcileError, SyncError, TranslateError};
pub use index_sync::IndexSync;
pub use reconciler::{IndexReconciler, ReconcileMode};
pub use report::{
    CycleReport, Failure, FailureLog, IndexSyncReport, Operation, RetirementReport, Severity,
    ShardingReport, TableReport,
};
pub use sharding::ShardingManager;
pub use sync_task::{SyncTask, TickOutcome};
pub use unique::UniqueTranslator;
