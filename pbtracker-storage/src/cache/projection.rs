//! Deletion and patch rules for each cache projection.
//!
//! Each projection denormalizes catalog facts in its own shape. These
//! functions are the only places that know those shapes, so the cleanup pass
//! and the best-known-time updater apply the same rules.

use pbtracker_core::{BestKnownTime, CategoryIndex, Game, GameListPages, GamePageRow, GameSummary};

/// Category index: game name -> category names.
pub mod category_index {
    use super::*;

    /// Build an index from catalog records.
    pub fn from_games(games: &[Game]) -> CategoryIndex {
        games
            .iter()
            .map(|g| (g.game.clone(), g.category_names()))
            .collect()
    }

    /// Remove the first occurrence of `category` from a game's list.
    ///
    /// Returns `false` when the name was not listed, i.e. the cache had
    /// already diverged from the store.
    pub fn remove_category(names: &mut Vec<String>, category: &str) -> bool {
        match names.iter().position(|c| c == category) {
            Some(pos) => {
                names.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Rewrite the entry found under `key` to mirror the store's record.
    ///
    /// When `key` differs from the stored game name the stale key is dropped
    /// and the entry is rewritten under the stored name. Returns `true` if
    /// the index changed.
    pub fn mirror_game(index: &mut CategoryIndex, key: &str, game: &Game) -> bool {
        let names = game.category_names();
        let renamed = key != game.game && index.remove(key).is_some();
        let rewritten = match index.get_mut(&game.game) {
            Some(existing) if *existing == names => false,
            Some(existing) => {
                *existing = names;
                true
            }
            None => {
                index.insert(game.game.clone(), names);
                true
            }
        };
        renamed || rewritten
    }

    /// Drop a deleted game. Returns `true` if it was present.
    pub fn remove_game(index: &mut CategoryIndex, game: &str) -> bool {
        index.remove(game).is_some()
    }
}

/// Paginated game list.
pub mod game_list {
    use super::*;

    /// Remove a deleted game's summary.
    ///
    /// A game appears on exactly one page, so scanning stops at the first
    /// match. Returns the page it was removed from.
    pub fn remove_game(pages: &mut GameListPages, game: &str) -> Option<u32> {
        for (page_num, page) in pages.iter_mut() {
            if let Some(pos) = page.games.iter().position(|s| s.game == game) {
                page.games.remove(pos);
                return Some(*page_num);
            }
        }
        None
    }

    /// Split games into pages of `page_size` summaries, numbered from 1.
    pub fn paginate(games: &[Game], page_size: usize) -> GameListPages {
        let page_size = page_size.max(1);
        let chunks: Vec<&[Game]> = games.chunks(page_size).collect();
        let last = chunks.len();
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let page = pbtracker_core::GameListPage {
                    games: chunk.iter().map(GameSummary::from_game).collect(),
                    has_next: i + 1 < last,
                };
                ((i + 1) as u32, page)
            })
            .collect()
    }
}

/// Per-game leaderboard rows.
pub mod game_page {
    use super::*;

    pub fn from_game(game: &Game) -> Vec<GamePageRow> {
        game.categories.iter().map(GamePageRow::from_category).collect()
    }

    /// Drop the row for a removed category. Returns `true` if a row was dropped.
    pub fn remove_category(rows: &mut Vec<GamePageRow>, category: &str) -> bool {
        let before = rows.len();
        rows.retain(|r| r.category != category);
        rows.len() != before
    }

    /// Patch the single row for `category` in place.
    ///
    /// Returns `false` if the page has no row for that category.
    pub fn apply_best_known(
        rows: &mut [GamePageRow],
        category: &str,
        best_known: Option<&BestKnownTime>,
    ) -> bool {
        match rows.iter_mut().find(|r| r.category == category) {
            Some(row) => {
                row.set_best_known(best_known);
                true
            }
            None => false,
        }
    }
}
