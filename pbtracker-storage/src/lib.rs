//! PB Tracker Storage - Collaborator Traits and In-Memory Implementations
//!
//! Defines the seams the background jobs talk through: the authoritative
//! catalog store, the run index, and the derived cache projections. The
//! in-memory implementations back the tests and local runs.

pub mod cache;
pub mod memory;
pub mod traits;

pub use cache::{
    projection, CategoryIndexCache, GameListCache, GamePageCache, GameRecordCache,
    GameRecordReader, ProjectionCaches,
};
pub use memory::{InMemoryCacheBackend, InMemoryCatalogStore, InMemoryRunIndex};
pub use traits::{CatalogStore, RunIndex};
