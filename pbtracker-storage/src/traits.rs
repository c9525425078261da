//! Catalog store and run index traits.
//!
//! Both are external collaborators: the storage engine behind them executes
//! its own queries and enforces its own limits. Implementations signal
//! capacity failures synchronously as `StorageError::ResourceExhausted`.

use async_trait::async_trait;
use pbtracker_core::{Game, PbResult};

/// Indexed lookup over submitted runs.
#[async_trait]
pub trait RunIndex: Send + Sync {
    /// Count runs for `(game, category)`, stopping at `limit`.
    ///
    /// Callers that only need existence pass a limit of 1.
    async fn count_runs(&self, game: &str, category: &str, limit: u32) -> PbResult<u32>;
}

/// Authoritative record of games and their embedded categories.
///
/// Writes are atomic per game: a `put_game` either replaces the whole
/// category list or leaves the previous one in place.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Get a game by its code. Returns `Ok(None)` if it does not exist.
    async fn get_game(&self, game_code: &str) -> PbResult<Option<Game>>;

    /// Insert or replace a game record.
    async fn put_game(&self, game: &Game) -> PbResult<()>;

    /// Delete a game record.
    async fn delete_game(&self, game: &Game) -> PbResult<()>;

    /// List every game. Used to rebuild a cold category index.
    async fn list_games(&self) -> PbResult<Vec<Game>>;
}
