//! Best-known-time update tests against the in-memory collaborators.

use pbtracker_core::{seconds_to_timestr, timestr_to_seconds, BktField, CategoryInfo, EntityKind, Game};
use pbtracker_jobs::BestKnownTimeUpdater;
use pbtracker_test_utils::assertions::{assert_not_found, assert_validation_fields};
use pbtracker_test_utils::fixtures::{bkt_input, CatalogFixture};
use proptest::prelude::*;
use tokio::runtime::Runtime;

fn fixture_with_metroid() -> CatalogFixture {
    let mut fixture = CatalogFixture::new();
    fixture.add_game(
        Game::new(
            "Super Metroid",
            vec![CategoryInfo::base("Any%"), CategoryInfo::new("100%")],
        ),
        &["Any%", "100%"],
    );
    fixture
}

fn updater_for(fixture: &CatalogFixture) -> BestKnownTimeUpdater {
    BestKnownTimeUpdater::new(fixture.store.clone(), &fixture.caches())
}

#[tokio::test]
async fn test_set_round_trips_through_store() {
    let fixture = fixture_with_metroid();
    let updater = updater_for(&fixture);

    let updated = updater
        .apply_best_known_time_update(
            "super-metroid",
            "100",
            &bkt_input("zoast", "1:24:03.7", "03/14/2014", "http://twitch.tv/zoast"),
            "admin",
        )
        .await
        .unwrap();

    assert_eq!(updated.category, "100%");
    assert_eq!(updated.bk_updater.as_deref(), Some("admin"));

    let stored = fixture.store.snapshot("super-metroid").unwrap();
    let info = stored.category("100%").unwrap();
    let bk = info.best_known.as_ref().unwrap();
    assert_eq!(bk.runner, "zoast");
    assert_eq!(bk.time_str(), "1:24:03.70");
    assert_eq!(bk.datestr, "03/14/2014");
    assert_eq!(bk.video, "http://twitch.tv/zoast");
    assert_eq!(info.bk_updater.as_deref(), Some("admin"));

    // Untouched category keeps its fields and flags.
    let any = stored.category("Any%").unwrap();
    assert!(any.best_known.is_none());
    assert!(any.is_base_category);

    // The record cache now serves the updated game.
    assert_eq!(fixture.backend.game_record_snapshot("super-metroid"), Some(stored));
}

#[tokio::test]
async fn test_clear_removes_all_fields_together() {
    let fixture = fixture_with_metroid();
    let updater = updater_for(&fixture);
    updater
        .apply_best_known_time_update(
            "super-metroid",
            "any",
            &bkt_input("zoast", "42:03", "", "http://v"),
            "alice",
        )
        .await
        .unwrap();

    let cleared = updater
        .apply_best_known_time_update("super-metroid", "any", &bkt_input("", "", "", ""), "bob")
        .await
        .unwrap();

    assert!(cleared.best_known.is_none());
    assert_eq!(cleared.bk_updater.as_deref(), Some("bob"));
    let stored = fixture.store.snapshot("super-metroid").unwrap();
    assert!(stored.category("Any%").unwrap().best_known.is_none());
}

#[tokio::test]
async fn test_validation_error_persists_nothing() {
    let fixture = fixture_with_metroid();
    let updater = updater_for(&fixture);
    let before = fixture.store.snapshot("super-metroid");

    let result = updater
        .apply_best_known_time_update(
            "super-metroid",
            "any",
            &bkt_input("", "0:00", "02/30/2014", "http://v"),
            "admin",
        )
        .await;

    assert_validation_fields(&result, &[BktField::Runner, BktField::Time, BktField::Date]);
    assert_eq!(fixture.store.snapshot("super-metroid"), before);
    assert_eq!(fixture.store.put_count(), 0);
}

#[tokio::test]
async fn test_unknown_game_or_category_is_not_found() {
    let fixture = fixture_with_metroid();
    let updater = updater_for(&fixture);
    let input = bkt_input("zoast", "42:03", "", "");

    let missing_game = updater
        .apply_best_known_time_update("metroid-fusion", "any", &input, "admin")
        .await;
    assert_not_found(&missing_game, EntityKind::Game);

    let missing_category = updater
        .apply_best_known_time_update("super-metroid", "low", &input, "admin")
        .await;
    assert_not_found(&missing_category, EntityKind::Category);
    assert_eq!(fixture.store.put_count(), 0);
}

#[tokio::test]
async fn test_unknown_category_reported_before_validation() {
    let fixture = fixture_with_metroid();
    let updater = updater_for(&fixture);
    let bad_input = bkt_input("", "not a time", "02/30/2014", "");

    let missing_category = updater
        .apply_best_known_time_update("super-metroid", "low", &bad_input, "admin")
        .await;
    assert_not_found(&missing_category, EntityKind::Category);

    let missing_game = updater
        .apply_best_known_time_update("metroid-fusion", "any", &bad_input, "admin")
        .await;
    assert_not_found(&missing_game, EntityKind::Game);
    assert_eq!(fixture.store.put_count(), 0);
}

#[tokio::test]
async fn test_oversized_time_is_a_validation_error() {
    let fixture = fixture_with_metroid();
    let updater = updater_for(&fixture);
    let before = fixture.store.snapshot("super-metroid");

    for time in ["9999999999999999999:00:00", "999999999999999999:00"] {
        let result = updater
            .apply_best_known_time_update("super-metroid", "any", &bkt_input("zoast", time, "", ""), "admin")
            .await;
        assert_validation_fields(&result, &[BktField::Time]);
    }
    assert_eq!(fixture.store.snapshot("super-metroid"), before);
    assert_eq!(fixture.store.put_count(), 0);
}

#[tokio::test]
async fn test_warm_game_page_patched_in_place() {
    let fixture = fixture_with_metroid();
    fixture.warm_caches(10);
    let index_before = fixture.backend.category_index_snapshot();
    let list_before = fixture.backend.game_list_snapshot();
    let updater = updater_for(&fixture);

    updater
        .apply_best_known_time_update(
            "super-metroid",
            "any",
            &bkt_input("zoast", "42:03.5", "03/14/2014", ""),
            "admin",
        )
        .await
        .unwrap();

    let rows = fixture.backend.game_page_snapshot("Super Metroid").unwrap();
    assert_eq!(rows[0].category, "Any%");
    assert_eq!(rows[0].bk_runner.as_deref(), Some("zoast"));
    assert_eq!(rows[0].bk_time.as_deref(), Some("42:03.50"));
    assert!(rows[0].bk_date.is_some());
    assert!(rows[1].bk_runner.is_none());

    assert_eq!(fixture.backend.category_index_snapshot(), index_before);
    assert_eq!(fixture.backend.game_list_snapshot(), list_before);
    assert_eq!(fixture.backend.category_index_commits(), 0);
    assert_eq!(fixture.backend.game_list_commits(), 0);
}

#[tokio::test]
async fn test_cold_game_page_left_cold() {
    let fixture = fixture_with_metroid();
    let updater = updater_for(&fixture);

    updater
        .apply_best_known_time_update("super-metroid", "any", &bkt_input("zoast", "42:03", "", ""), "admin")
        .await
        .unwrap();

    assert!(fixture.backend.game_page_snapshot("Super Metroid").is_none());
    assert_eq!(fixture.backend.game_page_commits(), 0);
}

#[tokio::test]
async fn test_store_write_failure_leaves_caches_alone() {
    let fixture = fixture_with_metroid();
    fixture.warm_caches(10);
    fixture.store.fail_put("super-metroid");
    let rows_before = fixture.backend.game_page_snapshot("Super Metroid");
    let updater = updater_for(&fixture);

    let result = updater
        .apply_best_known_time_update("super-metroid", "any", &bkt_input("zoast", "42:03", "", ""), "admin")
        .await;

    assert!(result.unwrap_err().is_resource_exhausted());
    assert_eq!(fixture.backend.game_page_snapshot("Super Metroid"), rows_before);
    assert_eq!(fixture.backend.game_page_commits(), 0);
}

fn time_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..60).prop_map(|s| s.to_string()),
        (0u32..60, 0u32..60).prop_map(|(m, s)| format!("{}:{:02}", m + 1, s)),
        (1u32..10, 0u32..60, 0u32..60, 0u32..100)
            .prop_map(|(h, m, s, f)| format!("{}:{:02}:{:02}.{:02}", h, m, s, f)),
    ]
}

fn date_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (1u32..=12, 1u32..=28, 2004u32..2030).prop_map(|(m, d, y)| format!("{:02}/{:02}/{}", m, d, y)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever is set reads back with the same runner, display time, date
    /// and video.
    #[test]
    fn prop_best_known_time_round_trip(
        runner in "[A-Za-z0-9_]{1,16}",
        time in time_strategy(),
        date in date_strategy(),
        video in prop_oneof![Just(String::new()), "http://[a-z]{3,10}\\.tv/[a-z0-9]{1,8}"],
    ) {
        let rt = Runtime::new()
            .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))?;
        rt.block_on(async {
            let fixture = fixture_with_metroid();
            let updater = updater_for(&fixture);

            updater
                .apply_best_known_time_update(
                    "super-metroid",
                    "100",
                    &bkt_input(&runner, &time, &date, &video),
                    "admin",
                )
                .await
                .map_err(|e| TestCaseError::fail(format!("Update failed: {}", e)))?;

            let stored = fixture
                .store
                .snapshot("super-metroid")
                .ok_or_else(|| TestCaseError::fail("Game vanished".to_string()))?;
            let bk = stored
                .category("100%")
                .and_then(|c| c.best_known.clone())
                .ok_or_else(|| TestCaseError::fail("Best known time missing".to_string()))?;

            let expected = timestr_to_seconds(&time).map_err(TestCaseError::fail)?;
            prop_assert_eq!(&bk.runner, &runner);
            prop_assert_eq!(bk.time_str(), seconds_to_timestr(expected));
            prop_assert_eq!(timestr_to_seconds(&bk.time_str()), Ok(bk.seconds));
            prop_assert_eq!(&bk.datestr, &date);
            prop_assert_eq!(&bk.video, &video);
            Ok(())
        })?;
    }
}
