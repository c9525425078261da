//! Cache backend traits for the derived projections.
//!
//! Every cache is read-modify-write on a local copy: callers load a snapshot,
//! mutate it, and commit the whole value back. Commits are overwrites, never
//! deltas, so replaying one is harmless.

use async_trait::async_trait;
use pbtracker_core::{CategoryIndex, Game, GameListPages, GamePageRow, PbResult};

/// Game name to category names, used for autocomplete.
#[async_trait]
pub trait CategoryIndexCache: Send + Sync {
    /// Load the whole index, or `None` if the cache is cold.
    async fn load(&self) -> PbResult<Option<CategoryIndex>>;

    async fn commit(&self, index: &CategoryIndex) -> PbResult<()>;
}

/// Paginated list of all games for the browse pages.
#[async_trait]
pub trait GameListCache: Send + Sync {
    async fn load(&self) -> PbResult<Option<GameListPages>>;

    async fn commit(&self, pages: &GameListPages) -> PbResult<()>;
}

/// Per-game leaderboard rows, one per category.
#[async_trait]
pub trait GamePageCache: Send + Sync {
    async fn load(&self, game: &str) -> PbResult<Option<Vec<GamePageRow>>>;

    async fn commit(&self, game: &str, rows: &[GamePageRow]) -> PbResult<()>;

    /// Drop the page so the reader path rebuilds it.
    async fn invalidate(&self, game: &str) -> PbResult<()>;
}

/// Game records cached by game code.
#[async_trait]
pub trait GameRecordCache: Send + Sync {
    async fn load(&self, game_code: &str) -> PbResult<Option<Game>>;

    async fn commit(&self, game_code: &str, game: &Game) -> PbResult<()>;

    async fn invalidate(&self, game_code: &str) -> PbResult<()>;
}
