//! # Schemata Core
//!
//! Core traits, types, and errors shared by the schemata crates.
//!
//! The reconciler never talks to a concrete database. Everything it needs
//! from the outside world goes through three narrow traits, which lets the
//! same reconciliation logic run against a production driver or the
//! in-memory stores used in tests.
//!
//! ## Key Traits
//!
//! - [`DocumentStore`]: table and index CRUD on the physical store
//! - [`ModelStore`]: read-only view of object, attribute and unique-constraint records
//! - [`LeadershipOracle`]: "am I the leader" check for multi-replica deployments
//!
//! ## Key Types
//!
//! - [`IndexDescriptor`]: a physical index (name, ordered keys, uniqueness)
//! - [`ManagedPrefixes`]: the naming convention marking reconciler-owned indexes
//! - [`ObjectRecord`], [`Attribute`], [`UniqueConstraint`]: model snapshots
//! - [`TableKind`]: classification of physical table names

pub mod error;
pub mod index;
pub mod model;
pub mod table;
pub mod traits;

// Re-export main types
pub use error::*;
pub use index::*;
pub use model::*;
pub use table::*;
pub use traits::*;
