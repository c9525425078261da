//! Catalog entities and cache projection shapes

use crate::{code, seconds_to_timestr};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Entity kind discriminator used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Game,
    Category,
    GameListPage,
    GamePage,
}

// ============================================================================
// CATALOG STORE ENTITIES
// ============================================================================

/// Best known time for a category, set and cleared as a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestKnownTime {
    pub runner: String,
    /// Elapsed time in seconds, rounded to hundredths.
    pub seconds: f64,
    /// Date exactly as entered; empty when no date was given.
    pub datestr: String,
    pub video: String,
}

impl BestKnownTime {
    /// Canonical display string for the elapsed time.
    pub fn time_str(&self) -> String {
        seconds_to_timestr(self.seconds)
    }

    /// Parsed date, if one was recorded and is well formed.
    pub fn date(&self) -> Option<NaiveDate> {
        crate::datestr_to_date(&self.datestr).ok().flatten()
    }
}

/// A category embedded in its parent [`Game`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub category: String,
    #[serde(default)]
    pub is_base_category: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_known: Option<BestKnownTime>,
    /// Username of whoever last set or cleared the best known time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bk_updater: Option<String>,
}

impl CategoryInfo {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            is_base_category: false,
            best_known: None,
            bk_updater: None,
        }
    }

    /// A category that survives cleanup regardless of its run count.
    pub fn base(category: impl Into<String>) -> Self {
        Self {
            is_base_category: true,
            ..Self::new(category)
        }
    }

    pub fn code(&self) -> String {
        code(&self.category)
    }
}

/// A game in the catalog store with its ordered category list.
///
/// A stored game never has an empty category list; the last category's
/// removal deletes the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game: String,
    pub categories: Vec<CategoryInfo>,
}

impl Game {
    pub fn new(game: impl Into<String>, categories: Vec<CategoryInfo>) -> Self {
        Self {
            game: game.into(),
            categories,
        }
    }

    pub fn code(&self) -> String {
        code(&self.game)
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.category.clone()).collect()
    }

    pub fn category(&self, name: &str) -> Option<&CategoryInfo> {
        self.categories.iter().find(|c| c.category == name)
    }

    /// Find a category by its normalised code. The supplied code is
    /// normalised again before matching.
    pub fn category_by_code_mut(&mut self, category_code: &str) -> Option<&mut CategoryInfo> {
        let wanted = code(category_code);
        self.categories.iter_mut().find(|c| c.code() == wanted)
    }
}

// ============================================================================
// BEST KNOWN TIME INPUT
// ============================================================================

/// Fields of the best-known-time form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BktField {
    Runner,
    Time,
    Date,
    Video,
}

impl fmt::Display for BktField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BktField::Runner => "runner",
            BktField::Time => "time",
            BktField::Date => "date",
            BktField::Video => "video",
        };
        f.write_str(name)
    }
}

/// Unvalidated best-known-time input as typed by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestKnownTimeInput {
    pub runner: String,
    pub time: String,
    pub date: String,
    pub video: String,
}

impl BestKnownTimeInput {
    /// All four fields empty means "clear the record".
    pub fn is_clear(&self) -> bool {
        self.runner.is_empty() && self.time.is_empty() && self.date.is_empty() && self.video.is_empty()
    }
}

// ============================================================================
// CACHE PROJECTIONS
// ============================================================================

/// Category index cache contents: game name to category names.
pub type CategoryIndex = BTreeMap<String, Vec<String>>;

/// One game's entry on a browse page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub game: String,
    pub game_code: String,
    pub num_categories: usize,
}

impl GameSummary {
    pub fn from_game(game: &Game) -> Self {
        Self {
            game: game.game.clone(),
            game_code: game.code(),
            num_categories: game.categories.len(),
        }
    }
}

/// One page of the paginated game list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameListPage {
    pub games: Vec<GameSummary>,
    pub has_next: bool,
}

/// Game list cache contents, keyed by page number.
pub type GameListPages = BTreeMap<u32, GameListPage>;

/// Display row for one category on a game's leaderboard page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePageRow {
    pub category: String,
    pub bk_runner: Option<String>,
    pub bk_time: Option<String>,
    pub bk_date: Option<NaiveDate>,
    pub bk_video: Option<String>,
}

impl GamePageRow {
    pub fn from_category(info: &CategoryInfo) -> Self {
        let mut row = Self {
            category: info.category.clone(),
            bk_runner: None,
            bk_time: None,
            bk_date: None,
            bk_video: None,
        };
        row.set_best_known(info.best_known.as_ref());
        row
    }

    /// Overwrite the four best-known-time columns together.
    pub fn set_best_known(&mut self, best_known: Option<&BestKnownTime>) {
        match best_known {
            Some(bk) => {
                self.bk_runner = Some(bk.runner.clone());
                self.bk_time = Some(bk.time_str());
                self.bk_date = bk.date();
                self.bk_video = Some(bk.video.clone());
            }
            None => {
                self.bk_runner = None;
                self.bk_time = None;
                self.bk_date = None;
                self.bk_video = None;
            }
        }
    }
}
