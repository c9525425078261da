//! Derived caches over the catalog store.
//!
//! Four projections denormalize the same catalog facts:
//!
//! - [`CategoryIndexCache`]: game name -> category names (autocomplete)
//! - [`GameListCache`]: paginated game summaries (browse pages)
//! - [`GamePageCache`]: per-game leaderboard rows
//! - [`GameRecordCache`]: whole game records keyed by code
//!
//! None of them is authoritative. When a projection disagrees with the
//! catalog store, the store wins and the projection is corrected.
//!
//! # Example
//!
//! ```ignore
//! let backend = Arc::new(InMemoryCacheBackend::new());
//! let caches = ProjectionCaches::from_backend(backend);
//!
//! if let Some(mut index) = caches.category_index.load().await? {
//!     projection::category_index::remove_game(&mut index, "Mega Man 9");
//!     caches.category_index.commit(&index).await?;
//! }
//! ```

pub mod projection;
pub mod read_through;
pub mod traits;

use std::sync::Arc;

pub use read_through::GameRecordReader;
pub use traits::{CategoryIndexCache, GameListCache, GamePageCache, GameRecordCache};

/// Handles to every cache projection.
#[derive(Clone)]
pub struct ProjectionCaches {
    pub category_index: Arc<dyn CategoryIndexCache>,
    pub game_list: Arc<dyn GameListCache>,
    pub game_pages: Arc<dyn GamePageCache>,
    pub game_records: Arc<dyn GameRecordCache>,
}

impl ProjectionCaches {
    /// Use one backend for all four projections.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CategoryIndexCache + GameListCache + GamePageCache + GameRecordCache + 'static,
    {
        Self {
            category_index: backend.clone(),
            game_list: backend.clone(),
            game_pages: backend.clone(),
            game_records: backend,
        }
    }
}
