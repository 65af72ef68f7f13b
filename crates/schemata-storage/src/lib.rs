//! # Schemata Storage
//!
//! In-memory implementations of the schemata store traits.
//!
//! - **InMemoryDocumentStore**: tables, indexes and documents held in memory,
//!   with an operation journal and fault injection for tests
//! - **InMemoryModelStore**: object, attribute and unique-constraint records
//!
//! Both are suitable for tests, simulations and single-process embedding.
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemata_core::{DocumentStore, IndexDescriptor};
//! use schemata_storage::InMemoryDocumentStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryDocumentStore::new();
//!     store.create_table("cc_ObjectBase_switch").await.unwrap();
//!
//!     let index = IndexDescriptor::new("bkcc_idx_InstId").asc("bk_inst_id");
//!     store.create_index("cc_ObjectBase_switch", &index).await.unwrap();
//!
//!     // Every mutating call is journaled
//!     assert_eq!(store.journal().len(), 2);
//! }
//! ```

pub mod memory;
pub mod model;

// Re-exports
pub use memory::{FaultOp, InMemoryDocumentStore, StoreOperation};
pub use model::{InMemoryModelStore, ModelQuery};
