//! Orphan Reconciliation
//!
//! Categories are created implicitly when a run is submitted for an unseen
//! game/category, and nothing deletes them when their runs go away. A
//! reconciliation pass walks the category index cache, asks the run index
//! whether each unprotected category still has runs, and reclaims the ones
//! that do not from the catalog store and every derived cache.
//!
//! # Failure model
//!
//! - Loading the category index or a game record with `ResourceExhausted`
//!   aborts the pass. Games already processed keep their store writes; the
//!   index and game list caches are not committed.
//! - A `ResourceExhausted` run index lookup defers that one category to the
//!   next pass.
//! - Cache/store disagreements are logged as inconsistencies and corrected
//!   from the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use pbtracker_core::{code, CategoryIndex, PbResult, ReconcileConfig};
use pbtracker_storage::projection::{category_index, game_list, game_page};
use pbtracker_storage::{CatalogStore, GameRecordReader, ProjectionCaches, RunIndex};

// ============================================================================
// OUTCOME
// ============================================================================

/// What a single reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Games read from the category index cache and examined
    pub games_scanned: usize,

    /// Removed category names keyed by game, in their original order
    pub removed_categories: BTreeMap<String, Vec<String>>,

    /// Games deleted because their last category was reclaimed
    pub deleted_games: Vec<String>,

    /// Games listed in the index cache but absent from the catalog store
    pub missing_games: Vec<String>,

    /// `(game, category)` pairs whose run lookup was exhausted
    pub deferred: Vec<(String, String)>,

    /// Cache/store disagreements found and corrected
    pub inconsistencies: u64,

    pub category_index_committed: bool,
    pub game_list_committed: bool,
}

impl ReconcileOutcome {
    pub fn categories_removed(&self) -> u64 {
        self.removed_categories.values().map(|c| c.len() as u64).sum()
    }

    /// True when the pass changed nothing anywhere.
    pub fn is_noop(&self) -> bool {
        self.removed_categories.is_empty()
            && self.deleted_games.is_empty()
            && self.missing_games.is_empty()
            && self.inconsistencies == 0
            && !self.category_index_committed
            && !self.game_list_committed
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Reclaims orphaned categories and games.
///
/// Games are processed one at a time; each game's store write is a single
/// commit. The category index and game list caches are read once and written
/// once per pass.
#[derive(Clone)]
pub struct ReconcileEngine {
    catalog: Arc<dyn CatalogStore>,
    runs: Arc<dyn RunIndex>,
    caches: ProjectionCaches,
    records: GameRecordReader,
    config: ReconcileConfig,
}

impl ReconcileEngine {
    /// A zero `run_lookup_limit` is raised to 1, since a zero limit would
    /// count every category as empty.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        runs: Arc<dyn RunIndex>,
        caches: ProjectionCaches,
        mut config: ReconcileConfig,
    ) -> Self {
        if config.run_lookup_limit == 0 {
            tracing::warn!("run_lookup_limit of 0 is invalid, using 1");
            config.run_lookup_limit = 1;
        }
        let records = GameRecordReader::new(catalog.clone(), caches.game_records.clone());
        Self {
            catalog,
            runs,
            caches,
            records,
            config,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run one reconciliation pass.
    ///
    /// Returns the pass outcome, or the error that aborted it.
    pub async fn reconcile_orphans(&self) -> PbResult<ReconcileOutcome> {
        let (mut index, mut index_dirty) = self.load_category_index().await?;
        let mut outcome = ReconcileOutcome::default();

        let game_names: Vec<String> = index.keys().cloned().collect();
        for game_name in game_names {
            outcome.games_scanned += 1;
            match self.reconcile_game(&game_name, &mut index, &mut outcome).await {
                Ok(changed) => index_dirty |= changed,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        game = %game_name,
                        games_scanned = outcome.games_scanned,
                        categories_removed = outcome.categories_removed(),
                        "Aborting reconciliation pass"
                    );
                    return Err(e);
                }
            }
        }

        if index_dirty {
            self.caches.category_index.commit(&index).await?;
            outcome.category_index_committed = true;
        }

        let gone: Vec<&String> = outcome
            .deleted_games
            .iter()
            .chain(outcome.missing_games.iter())
            .collect();
        if !gone.is_empty() {
            outcome.game_list_committed = self.prune_game_list(&gone).await?;
        }

        if outcome.is_noop() {
            tracing::trace!(
                games_scanned = outcome.games_scanned,
                deferred = outcome.deferred.len(),
                "Reconciliation pass completed with no orphans"
            );
        } else {
            tracing::info!(
                games_scanned = outcome.games_scanned,
                categories_removed = outcome.categories_removed(),
                games_deleted = outcome.deleted_games.len(),
                deferred = outcome.deferred.len(),
                inconsistencies = outcome.inconsistencies,
                "Reconciliation pass completed"
            );
        }

        Ok(outcome)
    }

    /// Load the index snapshot, rebuilding it from the store when cold.
    ///
    /// The flag is true when the snapshot must be committed back.
    async fn load_category_index(&self) -> PbResult<(CategoryIndex, bool)> {
        match self.caches.category_index.load().await {
            Ok(Some(index)) => Ok((index, false)),
            Ok(None) => {
                let games = self.catalog.list_games().await?;
                tracing::info!(
                    games = games.len(),
                    "Category index cache cold, rebuilt from catalog store"
                );
                Ok((category_index::from_games(&games), true))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load category index cache");
                Err(e)
            }
        }
    }

    /// Reconcile one game. Returns whether its index entry changed.
    async fn reconcile_game(
        &self,
        game_name: &str,
        index: &mut CategoryIndex,
        outcome: &mut ReconcileOutcome,
    ) -> PbResult<bool> {
        let game_code = code(game_name);
        let Some(mut game) = self.catalog.get_game(&game_code).await? else {
            tracing::warn!(
                game = %game_name,
                game_code = %game_code,
                "Inconsistency: game in category index cache is missing from catalog store"
            );
            outcome.inconsistencies += 1;
            category_index::remove_game(index, game_name);
            self.drop_game_caches(game_name, &game_code).await;
            outcome.missing_games.push(game_name.to_string());
            return Ok(true);
        };

        let protect_base = !self.config.is_override_game(&game.game);
        let mut survivors = Vec::with_capacity(game.categories.len());
        let mut removed = Vec::new();

        for info in std::mem::take(&mut game.categories) {
            if info.is_base_category && protect_base {
                tracing::trace!(
                    game = %game.game,
                    category = %info.category,
                    "Skipping base category"
                );
                survivors.push(info);
                continue;
            }

            let lookup = self
                .runs
                .count_runs(&game.game, &info.category, self.config.run_lookup_limit)
                .await;
            match lookup {
                Ok(0) => removed.push(info.category),
                Ok(_) => survivors.push(info),
                Err(e) if e.is_resource_exhausted() => {
                    tracing::warn!(
                        error = %e,
                        game = %game.game,
                        category = %info.category,
                        "Run index lookup exhausted, deferring category to next pass"
                    );
                    outcome
                        .deferred
                        .push((game.game.clone(), info.category.clone()));
                    survivors.push(info);
                }
                Err(e) => return Err(e),
            }
        }
        game.categories = survivors;

        let mut index_changed = false;
        if let Some(cached) = index.get_mut(game_name) {
            for category in &removed {
                if category_index::remove_category(cached, category) {
                    index_changed = true;
                } else {
                    tracing::warn!(
                        game = %game.game,
                        category = %category,
                        "Inconsistency: removed category was not in category index cache"
                    );
                    outcome.inconsistencies += 1;
                }
            }
        }

        if self.config.log_removals {
            for category in &removed {
                tracing::info!(game = %game.game, category = %category, "Removed orphaned category");
            }
        }

        if game.categories.is_empty() {
            self.catalog.delete_game(&game).await?;
            category_index::remove_game(index, game_name);
            category_index::remove_game(index, &game.game);
            self.drop_game_caches(&game.game, &game_code).await;
            tracing::info!(game = %game.game, "Deleted game with no remaining categories");
            outcome.deleted_games.push(game.game.clone());
            if !removed.is_empty() {
                outcome.removed_categories.insert(game.game, removed);
            }
            return Ok(true);
        }

        if !removed.is_empty() {
            self.catalog.put_game(&game).await?;
            self.records.refresh(&game_code, &game).await;
            self.trim_game_page(&game.game, &removed).await;
        }

        if category_index::mirror_game(index, game_name, &game) {
            tracing::warn!(
                game = %game.game,
                index_key = %game_name,
                "Inconsistency: category index cache disagreed with catalog store, rewrote entry"
            );
            outcome.inconsistencies += 1;
            index_changed = true;
        }

        if !removed.is_empty() {
            outcome.removed_categories.insert(game.game, removed);
        }
        Ok(index_changed)
    }

    /// Drop per-game caches for a game that no longer exists.
    async fn drop_game_caches(&self, game_name: &str, game_code: &str) {
        self.records.evict(game_code).await;
        if let Err(e) = self.caches.game_pages.invalidate(game_name).await {
            tracing::warn!(error = %e, game = %game_name, "Failed to invalidate game page cache");
        }
    }

    /// Drop rows for removed categories from a warm game page.
    async fn trim_game_page(&self, game_name: &str, removed: &[String]) {
        let mut rows = match self.caches.game_pages.load(game_name).await {
            Ok(Some(rows)) => rows,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, game = %game_name, "Failed to load game page cache, invalidating");
                self.invalidate_game_page(game_name).await;
                return;
            }
        };

        let mut changed = false;
        for category in removed {
            changed |= game_page::remove_category(&mut rows, category);
        }
        if !changed {
            return;
        }

        if let Err(e) = self.caches.game_pages.commit(game_name, &rows).await {
            tracing::warn!(error = %e, game = %game_name, "Failed to commit game page cache, invalidating");
            self.invalidate_game_page(game_name).await;
        }
    }

    async fn invalidate_game_page(&self, game_name: &str) {
        if let Err(e) = self.caches.game_pages.invalidate(game_name).await {
            tracing::warn!(error = %e, game = %game_name, "Failed to invalidate game page cache");
        }
    }

    /// Remove deleted games from the game list cache, if warm.
    ///
    /// Returns whether the cache was committed.
    async fn prune_game_list(&self, games: &[&String]) -> PbResult<bool> {
        let Some(mut pages) = self.caches.game_list.load().await? else {
            tracing::debug!("Game list cache cold, nothing to prune");
            return Ok(false);
        };

        let mut changed = false;
        for game in games {
            if let Some(page) = game_list::remove_game(&mut pages, game) {
                tracing::debug!(game = %game, page, "Removed deleted game from game list cache");
                changed = true;
            }
        }

        if changed {
            self.caches.game_list.commit(&pages).await?;
        }
        Ok(changed)
    }
}

// ============================================================================
// TESTS
// ============================================================================
