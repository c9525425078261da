//! PB Tracker Test Utilities
//!
//! Shared test infrastructure for the PB Tracker workspace:
//! - A catalog fixture wiring the in-memory store, run index and caches
//! - Proptest generators for catalogs with mixed live/orphaned categories
//! - Assertions for cache/store consistency and error variants

pub use pbtracker_core::{
    code, BestKnownTimeInput, BktField, CategoryIndex, CategoryInfo, EntityKind, Game,
    GamePageRow, PbError, PbResult, ReconcileConfig, StorageError,
};
pub use pbtracker_storage::{
    projection, InMemoryCacheBackend, InMemoryCatalogStore, InMemoryRunIndex, ProjectionCaches,
};

use std::sync::Arc;

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! A seeded catalog with its collaborators.

    use super::*;

    /// One seeded category and whether it has runs.
    #[derive(Debug, Clone)]
    pub struct CategorySeed {
        pub info: CategoryInfo,
        pub has_runs: bool,
    }

    /// One seeded game.
    #[derive(Debug, Clone)]
    pub struct GameSeed {
        pub game: String,
        pub categories: Vec<CategorySeed>,
    }

    impl GameSeed {
        pub fn to_game(&self) -> Game {
            Game::new(
                self.game.clone(),
                self.categories.iter().map(|c| c.info.clone()).collect(),
            )
        }
    }

    /// In-memory catalog store, run index and cache backend seeded together.
    pub struct CatalogFixture {
        pub store: Arc<InMemoryCatalogStore>,
        pub runs: Arc<InMemoryRunIndex>,
        pub backend: Arc<InMemoryCacheBackend>,
        games: Vec<String>,
    }

    impl Default for CatalogFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CatalogFixture {
        pub fn new() -> Self {
            Self {
                store: Arc::new(InMemoryCatalogStore::new()),
                runs: Arc::new(InMemoryRunIndex::new()),
                backend: Arc::new(InMemoryCacheBackend::new()),
                games: Vec::new(),
            }
        }

        /// Build a fixture from generated seeds with all caches warm.
        pub fn from_seeds(seeds: &[GameSeed], page_size: usize) -> Self {
            let mut fixture = Self::new();
            for seed in seeds {
                let live: Vec<&str> = seed
                    .categories
                    .iter()
                    .filter(|c| c.has_runs)
                    .map(|c| c.info.category.as_str())
                    .collect();
                fixture.add_game(seed.to_game(), &live);
            }
            fixture.warm_caches(page_size);
            fixture
        }

        /// Store a game and record one run for each live category.
        pub fn add_game(&mut self, game: Game, live_categories: &[&str]) {
            for category in live_categories {
                self.runs.add_run(&game.game, category);
            }
            self.games.push(game.game.clone());
            self.store
                .seed(game)
                .unwrap_or_else(|e| panic!("failed to seed fixture game: {}", e));
        }

        /// Build every cache from the current store contents.
        pub fn warm_caches(&self, page_size: usize) {
            let games = self.stored_games();
            self.backend
                .seed_category_index(projection::category_index::from_games(&games));
            self.backend
                .seed_game_list(projection::game_list::paginate(&games, page_size));
            for game in &games {
                self.backend
                    .seed_game_page(&game.game, projection::game_page::from_game(game));
            }
        }

        pub fn caches(&self) -> ProjectionCaches {
            ProjectionCaches::from_backend(self.backend.clone())
        }

        /// Every seeded game name, whether or not it still exists.
        pub fn seeded_games(&self) -> &[String] {
            &self.games
        }

        /// Seeded games still present in the store, in seeding order.
        pub fn stored_games(&self) -> Vec<Game> {
            self.games
                .iter()
                .filter_map(|name| self.store.snapshot(&code(name)))
                .collect()
        }
    }

    /// A game with one base category and one ordinary category.
    pub fn game_with_base(name: &str) -> Game {
        Game::new(
            name,
            vec![CategoryInfo::base("Any%"), CategoryInfo::new("100%")],
        )
    }

    /// A valid best-known-time form submission.
    pub fn bkt_input(runner: &str, time: &str, date: &str, video: &str) -> BestKnownTimeInput {
        BestKnownTimeInput {
            runner: runner.to_string(),
            time: time.to_string(),
            date: date.to_string(),
            video: video.to_string(),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generated catalogs.

    use super::fixtures::{CategorySeed, GameSeed};
    use super::*;
    use proptest::prelude::*;

    /// A category with a random base flag and run state.
    ///
    /// Names are indexed so they stay unique within a game.
    pub fn arb_category_seed(index: usize) -> impl Strategy<Value = CategorySeed> {
        (any::<bool>(), any::<bool>()).prop_map(move |(is_base, has_runs)| {
            let name = format!("Category {}", index);
            let info = if is_base {
                CategoryInfo::base(name)
            } else {
                CategoryInfo::new(name)
            };
            CategorySeed { info, has_runs }
        })
    }

    pub fn arb_game_seed(index: usize, max_categories: usize) -> impl Strategy<Value = GameSeed> {
        (1..=max_categories.max(1))
            .prop_flat_map(|n| (0..n).map(arb_category_seed).collect::<Vec<_>>())
            .prop_map(move |categories| GameSeed {
                game: format!("Game {}", index),
                categories,
            })
    }

    /// A catalog of 1..=`max_games` games with distinct names and codes.
    pub fn arb_catalog(max_games: usize, max_categories: usize) -> impl Strategy<Value = Vec<GameSeed>> {
        (1..=max_games.max(1)).prop_flat_map(move |n| {
            (0..n)
                .map(|i| arb_game_seed(i, max_categories))
                .collect::<Vec<_>>()
        })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for catalog/cache consistency and error variants.

    use super::fixtures::CatalogFixture;
    use super::*;

    /// Assert that every warm cache agrees with the catalog store.
    ///
    /// - the category index mirrors each stored game's category names
    /// - no game list summary references a missing game
    /// - no game page row references a missing category
    #[track_caller]
    pub fn assert_caches_consistent(fixture: &CatalogFixture) {
        let stored = fixture.stored_games();

        if let Some(index) = fixture.backend.category_index_snapshot() {
            for (game, names) in &index {
                let record = stored
                    .iter()
                    .find(|g| &g.game == game)
                    .unwrap_or_else(|| panic!("Index lists {} which is not in the store", game));
                assert_eq!(
                    names,
                    &record.category_names(),
                    "Index entry for {} does not mirror the store",
                    game
                );
            }
        }

        if let Some(pages) = fixture.backend.game_list_snapshot() {
            for (page_num, page) in &pages {
                for summary in &page.games {
                    assert!(
                        stored.iter().any(|g| g.game == summary.game),
                        "Game list page {} lists missing game {}",
                        page_num,
                        summary.game
                    );
                }
            }
        }

        for game in fixture.seeded_games() {
            let Some(rows) = fixture.backend.game_page_snapshot(game) else {
                continue;
            };
            let record = stored
                .iter()
                .find(|g| &g.game == game)
                .unwrap_or_else(|| panic!("Game page cached for missing game {}", game));
            for row in &rows {
                assert!(
                    record.category(&row.category).is_some(),
                    "Game page for {} has row for missing category {}",
                    game,
                    row.category
                );
            }
        }
    }

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &PbResult<T>, entity: EntityKind) {
        match result {
            Err(PbError::Storage(StorageError::NotFound { entity: e, .. })) => {
                assert_eq!(*e, entity, "Wrong entity kind in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity, other),
        }
    }

    #[track_caller]
    pub fn assert_resource_exhausted<T: std::fmt::Debug>(result: &PbResult<T>) {
        match result {
            Err(PbError::Storage(StorageError::ResourceExhausted { .. })) => {}
            other => panic!("Expected ResourceExhausted error, got: {:?}", other),
        }
    }

    /// Assert a validation error naming exactly `fields`.
    #[track_caller]
    pub fn assert_validation_fields<T: std::fmt::Debug>(result: &PbResult<T>, fields: &[BktField]) {
        match result {
            Err(PbError::Validation(err)) => {
                let got: Vec<BktField> = err.errors.keys().copied().collect();
                let mut want = fields.to_vec();
                want.sort();
                assert_eq!(got, want, "Wrong fields in validation error");
            }
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
