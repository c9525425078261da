//! Best-known-time updates.
//!
//! A best known time is four fields set or cleared together. Updates write
//! the catalog store first and then push the single changed row into the
//! caches that display it. The category index is untouched because names do
//! not change.

use std::sync::Arc;

use pbtracker_core::{
    code, datestr_to_date, timestr_to_seconds, BestKnownTime, BestKnownTimeInput, BktField,
    CategoryInfo, EntityKind, PbResult, StorageError, ValidationError,
};
use pbtracker_storage::projection::game_page;
use pbtracker_storage::{CatalogStore, GamePageCache, GameRecordReader, ProjectionCaches};

/// Validate raw input into the record to store.
///
/// `Ok(None)` means clear. Every failing field is reported at once.
pub fn validate_best_known_time(
    input: &BestKnownTimeInput,
) -> Result<Option<BestKnownTime>, ValidationError> {
    if input.is_clear() {
        return Ok(None);
    }

    let mut errors = ValidationError::new(input.clone());

    let runner = input.runner.trim();
    if runner.is_empty() {
        errors.push(BktField::Runner, "You must enter a runner");
    }

    let seconds = match timestr_to_seconds(&input.time) {
        Ok(seconds) => Some(seconds),
        Err(reason) => {
            errors.push(BktField::Time, format!("Invalid time: {}", reason));
            None
        }
    };

    if let Err(reason) = datestr_to_date(&input.date) {
        errors.push(BktField::Date, format!("Invalid date: {}", reason));
    }

    match seconds {
        Some(seconds) if errors.is_empty() => Ok(Some(BestKnownTime {
            runner: runner.to_string(),
            seconds,
            datestr: input.date.trim().to_string(),
            video: input.video.trim().to_string(),
        })),
        _ => Err(errors),
    }
}

/// Applies best-known-time updates to a game's category.
#[derive(Clone)]
pub struct BestKnownTimeUpdater {
    catalog: Arc<dyn CatalogStore>,
    records: GameRecordReader,
    game_pages: Arc<dyn GamePageCache>,
}

impl BestKnownTimeUpdater {
    pub fn new(catalog: Arc<dyn CatalogStore>, caches: &ProjectionCaches) -> Self {
        Self {
            records: GameRecordReader::new(catalog.clone(), caches.game_records.clone()),
            catalog,
            game_pages: caches.game_pages.clone(),
        }
    }

    /// Set or clear the best known time for `(game_code, category_code)`.
    ///
    /// Both codes are normalised before lookup, and an unknown game or
    /// category is reported before the input is validated. `updater` is
    /// recorded as the last user to touch the record, for clears as well as
    /// sets. On any error nothing is persisted.
    pub async fn apply_best_known_time_update(
        &self,
        game_code: &str,
        category_code: &str,
        input: &BestKnownTimeInput,
        updater: &str,
    ) -> PbResult<CategoryInfo> {
        let game_code = code(game_code);
        let mut game = self
            .records
            .get(&game_code)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityKind::Game, game_code.clone()))?;

        let info = game.category_by_code_mut(category_code).ok_or_else(|| {
            StorageError::not_found(
                EntityKind::Category,
                format!("{}/{}", game_code, code(category_code)),
            )
        })?;

        info.best_known = validate_best_known_time(input)?;
        info.bk_updater = Some(updater.to_string());
        let updated = info.clone();

        self.catalog.put_game(&game).await?;
        self.records.refresh(&game_code, &game).await;

        tracing::info!(
            game = %game.game,
            category = %updated.category,
            updater,
            cleared = updated.best_known.is_none(),
            "Updated best known time"
        );

        self.patch_game_page(&game.game, &updated).await;
        Ok(updated)
    }

    /// Patch the single row in a warm game page. Cold pages are left for
    /// their reader to rebuild.
    async fn patch_game_page(&self, game_name: &str, info: &CategoryInfo) {
        let mut rows = match self.game_pages.load(game_name).await {
            Ok(Some(rows)) => rows,
            Ok(None) => {
                tracing::debug!(game = %game_name, "Game page cache cold, skipping patch");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, game = %game_name, "Failed to load game page cache");
                return;
            }
        };

        if !game_page::apply_best_known(&mut rows, &info.category, info.best_known.as_ref()) {
            tracing::warn!(
                game = %game_name,
                category = %info.category,
                "Inconsistency: game page cache has no row for category, invalidating"
            );
            if let Err(e) = self.game_pages.invalidate(game_name).await {
                tracing::warn!(error = %e, game = %game_name, "Failed to invalidate game page cache");
            }
            return;
        }

        if let Err(e) = self.game_pages.commit(game_name, &rows).await {
            tracing::warn!(error = %e, game = %game_name, "Failed to commit game page cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(runner: &str, time: &str, date: &str, video: &str) -> BestKnownTimeInput {
        BestKnownTimeInput {
            runner: runner.to_string(),
            time: time.to_string(),
            date: date.to_string(),
            video: video.to_string(),
        }
    }

    #[test]
    fn test_validate_clear() {
        assert_eq!(validate_best_known_time(&BestKnownTimeInput::default()), Ok(None));
    }

    #[test]
    fn test_validate_set() {
        let bk = validate_best_known_time(&input(" zoast ", "42:03.5", "03/14/2014", "http://v"))
            .unwrap()
            .unwrap();
        assert_eq!(bk.runner, "zoast");
        assert_eq!(bk.seconds, 2523.5);
        assert_eq!(bk.time_str(), "42:03.50");
        assert_eq!(bk.datestr, "03/14/2014");
        assert_eq!(bk.video, "http://v");
    }

    #[test]
    fn test_validate_date_optional() {
        let bk = validate_best_known_time(&input("zoast", "1:00", "", ""))
            .unwrap()
            .unwrap();
        assert!(bk.date().is_none());
        assert!(bk.datestr.is_empty());
    }

    #[test]
    fn test_validate_collects_every_field_error() {
        let raw = input("", "1:75", "14/03/2014", "http://v");
        let err = validate_best_known_time(&raw).unwrap_err();

        assert_eq!(err.errors.len(), 3);
        assert_eq!(err.message(BktField::Runner), Some("You must enter a runner"));
        assert!(err.message(BktField::Time).unwrap().starts_with("Invalid time:"));
        assert!(err.message(BktField::Date).unwrap().starts_with("Invalid date:"));
        assert!(err.message(BktField::Video).is_none());
        assert_eq!(err.input, raw);
    }

    #[test]
    fn test_validate_rejects_oversized_time() {
        let err = validate_best_known_time(&input("zoast", "9999999999999999999:00:00", "", ""))
            .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.message(BktField::Time), Some("Invalid time: time too large"));
    }

    #[test]
    fn test_validate_video_only_is_not_clear() {
        let err = validate_best_known_time(&input("", "", "", "http://v")).unwrap_err();
        assert!(err.message(BktField::Runner).is_some());
        assert!(err.message(BktField::Time).is_some());
        assert!(err.message(BktField::Date).is_none());
    }
}
