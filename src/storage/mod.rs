//! Graph session backends
//!
//! The projection engine writes through the `GraphStore` trait.
//! `SqliteStore` persists the graph; `MemoryStore` keeps it in-process.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{GraphStore, NodeFilter, OpenStore, StorageError, StorageResult};
