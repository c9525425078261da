//! In-memory collaborators for tests and local runs.
//!
//! Each type can be told to fail specific operations with
//! `StorageError::ResourceExhausted`, which is how the external store and
//! index report capacity problems.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use pbtracker_core::{
    CategoryIndex, CategoryInfo, Game, GameListPages, GamePageRow, PbResult, StorageError,
};

use crate::cache::{CategoryIndexCache, GameListCache, GamePageCache, GameRecordCache};
use crate::traits::{CatalogStore, RunIndex};

fn poisoned<T>(_: PoisonError<T>) -> StorageError {
    StorageError::LockPoisoned
}

// ============================================================================
// CATALOG STORE
// ============================================================================

/// A stored game row: the name plus its category list serialized as JSON.
#[derive(Debug, Clone)]
struct StoredGame {
    game: String,
    info: String,
}

impl StoredGame {
    fn encode(game: &Game) -> Result<Self, StorageError> {
        let info = serde_json::to_string(&game.categories).map_err(|e| StorageError::Backend {
            reason: format!("failed to encode categories for {}: {}", game.game, e),
        })?;
        Ok(Self {
            game: game.game.clone(),
            info,
        })
    }

    fn decode(&self) -> Result<Game, StorageError> {
        let categories: Vec<CategoryInfo> =
            serde_json::from_str(&self.info).map_err(|e| StorageError::Backend {
                reason: format!("failed to decode categories for {}: {}", self.game, e),
            })?;
        Ok(Game::new(self.game.clone(), categories))
    }
}

/// In-memory catalog store keyed by game code.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    games: RwLock<HashMap<String, StoredGame>>,
    failing_gets: RwLock<HashSet<String>>,
    failing_puts: RwLock<HashSet<String>>,
    puts: AtomicU64,
    deletes: AtomicU64,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a game without going through the write counters.
    pub fn seed(&self, game: Game) -> PbResult<()> {
        let stored = StoredGame::encode(&game)?;
        self.games
            .write()
            .map_err(poisoned)?
            .insert(game.code(), stored);
        Ok(())
    }

    /// Make `get_game` for this code fail with ResourceExhausted.
    pub fn fail_get(&self, game_code: &str) {
        self.failing_gets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(game_code.to_string());
    }

    /// Make `put_game` and `delete_game` for this code fail with ResourceExhausted.
    pub fn fail_put(&self, game_code: &str) {
        self.failing_puts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(game_code.to_string());
    }

    pub fn clear_faults(&self) {
        self.failing_gets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.failing_puts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Decoded copy of a stored game, bypassing fault injection.
    pub fn snapshot(&self, game_code: &str) -> Option<Game> {
        let games = self.games.read().unwrap_or_else(PoisonError::into_inner);
        games.get(game_code).and_then(|g| g.decode().ok())
    }

    pub fn game_count(&self) -> usize {
        self.games.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get_game(&self, game_code: &str) -> PbResult<Option<Game>> {
        if self.failing_gets.read().map_err(poisoned)?.contains(game_code) {
            return Err(StorageError::resource_exhausted(
                "get_game",
                format!("read quota exceeded loading {}", game_code),
            )
            .into());
        }
        let games = self.games.read().map_err(poisoned)?;
        match games.get(game_code) {
            Some(stored) => Ok(Some(stored.decode()?)),
            None => Ok(None),
        }
    }

    async fn put_game(&self, game: &Game) -> PbResult<()> {
        let game_code = game.code();
        if self.failing_puts.read().map_err(poisoned)?.contains(&game_code) {
            return Err(StorageError::resource_exhausted(
                "put_game",
                format!("write quota exceeded storing {}", game_code),
            )
            .into());
        }
        if game.categories.is_empty() {
            return Err(StorageError::Backend {
                reason: format!("refusing to store {} with no categories", game.game),
            }
            .into());
        }
        let stored = StoredGame::encode(game)?;
        self.games.write().map_err(poisoned)?.insert(game_code, stored);
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete_game(&self, game: &Game) -> PbResult<()> {
        let game_code = game.code();
        if self.failing_puts.read().map_err(poisoned)?.contains(&game_code) {
            return Err(StorageError::resource_exhausted(
                "delete_game",
                format!("write quota exceeded deleting {}", game_code),
            )
            .into());
        }
        self.games.write().map_err(poisoned)?.remove(&game_code);
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn list_games(&self) -> PbResult<Vec<Game>> {
        let games = self.games.read().map_err(poisoned)?;
        let mut out = games
            .values()
            .map(StoredGame::decode)
            .collect::<Result<Vec<_>, _>>()?;
        out.sort_by(|a, b| a.game.cmp(&b.game));
        Ok(out)
    }
}

// ============================================================================
// RUN INDEX
// ============================================================================

/// In-memory run counts per `(game, category)`.
#[derive(Debug, Default)]
pub struct InMemoryRunIndex {
    runs: RwLock<HashMap<(String, String), u32>>,
    failing: RwLock<HashSet<(String, String)>>,
    lookups: AtomicU64,
}

impl InMemoryRunIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_run(&self, game: &str, category: &str) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        *runs
            .entry((game.to_string(), category.to_string()))
            .or_insert(0) += 1;
    }

    pub fn set_runs(&self, game: &str, category: &str, count: u32) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if count == 0 {
            runs.remove(&(game.to_string(), category.to_string()));
        } else {
            runs.insert((game.to_string(), category.to_string()), count);
        }
    }

    /// Make lookups for this pair fail with ResourceExhausted.
    pub fn fail_lookup(&self, game: &str, category: &str) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((game.to_string(), category.to_string()));
    }

    pub fn clear_faults(&self) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of `count_runs` calls served, including failed ones.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RunIndex for InMemoryRunIndex {
    async fn count_runs(&self, game: &str, category: &str, limit: u32) -> PbResult<u32> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = (game.to_string(), category.to_string());
        if self.failing.read().map_err(poisoned)?.contains(&key) {
            return Err(StorageError::resource_exhausted(
                "count_runs",
                format!("query quota exceeded for {} / {}", game, category),
            )
            .into());
        }
        let runs = self.runs.read().map_err(poisoned)?;
        Ok(runs.get(&key).copied().unwrap_or(0).min(limit))
    }
}

// ============================================================================
// CACHE BACKEND
// ============================================================================

/// Memcache-style backend implementing every cache projection.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    category_index: RwLock<Option<CategoryIndex>>,
    game_list: RwLock<Option<GameListPages>>,
    game_pages: RwLock<HashMap<String, Vec<GamePageRow>>>,
    game_records: RwLock<HashMap<String, Game>>,
    fail_index_load: AtomicBool,
    index_commits: AtomicU64,
    list_commits: AtomicU64,
    page_commits: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_category_index(&self, index: CategoryIndex) {
        *self
            .category_index
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(index);
    }

    pub fn seed_game_list(&self, pages: GameListPages) {
        *self.game_list.write().unwrap_or_else(PoisonError::into_inner) = Some(pages);
    }

    pub fn seed_game_page(&self, game: &str, rows: Vec<GamePageRow>) {
        self.game_pages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(game.to_string(), rows);
    }

    pub fn seed_game_record(&self, game: Game) {
        self.game_records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(game.code(), game);
    }

    /// Make loading the category index fail with ResourceExhausted.
    pub fn fail_category_index_load(&self, fail: bool) {
        self.fail_index_load.store(fail, Ordering::Relaxed);
    }

    pub fn category_index_snapshot(&self) -> Option<CategoryIndex> {
        self.category_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn game_list_snapshot(&self) -> Option<GameListPages> {
        self.game_list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn game_page_snapshot(&self, game: &str) -> Option<Vec<GamePageRow>> {
        self.game_pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(game)
            .cloned()
    }

    pub fn game_record_snapshot(&self, game_code: &str) -> Option<Game> {
        self.game_records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(game_code)
            .cloned()
    }

    pub fn category_index_commits(&self) -> u64 {
        self.index_commits.load(Ordering::Relaxed)
    }

    pub fn game_list_commits(&self) -> u64 {
        self.list_commits.load(Ordering::Relaxed)
    }

    pub fn game_page_commits(&self) -> u64 {
        self.page_commits.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CategoryIndexCache for InMemoryCacheBackend {
    async fn load(&self) -> PbResult<Option<CategoryIndex>> {
        if self.fail_index_load.load(Ordering::Relaxed) {
            return Err(StorageError::resource_exhausted(
                "load_category_index",
                "cache read quota exceeded",
            )
            .into());
        }
        Ok(self.category_index.read().map_err(poisoned)?.clone())
    }

    async fn commit(&self, index: &CategoryIndex) -> PbResult<()> {
        *self.category_index.write().map_err(poisoned)? = Some(index.clone());
        self.index_commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl GameListCache for InMemoryCacheBackend {
    async fn load(&self) -> PbResult<Option<GameListPages>> {
        Ok(self.game_list.read().map_err(poisoned)?.clone())
    }

    async fn commit(&self, pages: &GameListPages) -> PbResult<()> {
        *self.game_list.write().map_err(poisoned)? = Some(pages.clone());
        self.list_commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl GamePageCache for InMemoryCacheBackend {
    async fn load(&self, game: &str) -> PbResult<Option<Vec<GamePageRow>>> {
        Ok(self.game_pages.read().map_err(poisoned)?.get(game).cloned())
    }

    async fn commit(&self, game: &str, rows: &[GamePageRow]) -> PbResult<()> {
        self.game_pages
            .write()
            .map_err(poisoned)?
            .insert(game.to_string(), rows.to_vec());
        self.page_commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn invalidate(&self, game: &str) -> PbResult<()> {
        self.game_pages.write().map_err(poisoned)?.remove(game);
        Ok(())
    }
}

#[async_trait]
impl GameRecordCache for InMemoryCacheBackend {
    async fn load(&self, game_code: &str) -> PbResult<Option<Game>> {
        Ok(self.game_records.read().map_err(poisoned)?.get(game_code).cloned())
    }

    async fn commit(&self, game_code: &str, game: &Game) -> PbResult<()> {
        self.game_records
            .write()
            .map_err(poisoned)?
            .insert(game_code.to_string(), game.clone());
        Ok(())
    }

    async fn invalidate(&self, game_code: &str) -> PbResult<()> {
        self.game_records.write().map_err(poisoned)?.remove(game_code);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
