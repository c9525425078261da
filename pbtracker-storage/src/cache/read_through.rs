//! Read-through loading of game records.
//!
//! Reads consult the game record cache first and fall back to the catalog
//! store on a miss, populating the cache afterwards. Cache failures never
//! fail the read: the store is authoritative and the cache is rebuildable.

use std::sync::Arc;

use pbtracker_core::{Game, PbResult};

use super::traits::GameRecordCache;
use crate::traits::CatalogStore;

/// Game loader that routes reads through the record cache.
#[derive(Clone)]
pub struct GameRecordReader {
    store: Arc<dyn CatalogStore>,
    cache: Arc<dyn GameRecordCache>,
}

impl GameRecordReader {
    pub fn new(store: Arc<dyn CatalogStore>, cache: Arc<dyn GameRecordCache>) -> Self {
        Self { store, cache }
    }

    /// Get a game by code, from the cache when warm.
    pub async fn get(&self, game_code: &str) -> PbResult<Option<Game>> {
        match self.cache.load(game_code).await {
            Ok(Some(game)) => return Ok(Some(game)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, game_code, "Game record cache read failed, using store");
            }
        }

        let game = self.store.get_game(game_code).await?;
        if let Some(ref game) = game {
            self.refresh(game_code, game).await;
        }
        Ok(game)
    }

    /// Push a freshly persisted record into the cache.
    pub async fn refresh(&self, game_code: &str, game: &Game) {
        if let Err(e) = self.cache.commit(game_code, game).await {
            tracing::warn!(error = %e, game_code, "Failed to refresh game record cache");
        }
    }

    /// Drop a deleted game's record from the cache.
    pub async fn evict(&self, game_code: &str) {
        if let Err(e) = self.cache.invalidate(game_code).await {
            tracing::warn!(error = %e, game_code, "Failed to evict game record cache entry");
        }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }
}
