//! Integration tests for the completion workflow.
//!
//! Imports a playlist, completes videos across several days and checks that
//! progress, streaks, goals and stats agree with the stored history.

use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
use learnpace_core::{
    CoreError, Database, Event, GoalStore, PlaylistImport, PlaylistStore, ProgressTracker,
    SchedulePlanner, StreakStore, StreakTransition, ValidationError, WatchTime,
};

const EXPORT: &str = r#"{
    "id": "PLrust",
    "title": "Rust in a week",
    "videos": [
        {"id": "v1", "title": "Ownership", "duration": "PT10M"},
        {"id": "v2", "title": "Borrowing", "duration": "PT10M"},
        {"id": "v3", "title": "Lifetimes", "duration": "PT10M"},
        {"id": "v4", "title": "Traits", "duration": "PT10M"}
    ]
}"#;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn setup() -> Database {
    let db = Database::open_memory().unwrap();
    let playlist = PlaylistImport::from_json(EXPORT)
        .unwrap()
        .into_playlist("u", day(1), 2)
        .unwrap();
    db.insert_playlist(&playlist).unwrap();
    db
}

#[test]
fn test_full_week_of_completions() {
    let db = setup();
    let tracker = ProgressTracker::new(&db);
    let at = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 20, 0, 0).unwrap();

    // Jan 1-3 then a gap on Jan 4
    tracker.complete_video("PLrust", "v1", at(1)).unwrap();
    tracker.complete_video("PLrust", "v2", at(2)).unwrap();
    let third = tracker.complete_video("PLrust", "v3", at(3)).unwrap();
    assert_eq!(third.streak.current_streak(), 3);

    let fifth = tracker.complete_video("PLrust", "v4", at(5)).unwrap();
    assert!(fifth.events.iter().any(|e| matches!(
        e,
        Event::StreakUpdated {
            transition: StreakTransition::Reset,
            current_streak: 1,
            longest_streak: 3,
            ..
        }
    )));
    assert!(fifth.progress.is_finished());
    assert_eq!(fifth.progress.progress_percentage, 100.0);

    let stored = db.load_streak("u").unwrap();
    assert_eq!(stored.current_streak(), 1);
    assert_eq!(stored.longest_streak(), 3);

    let summary = tracker.streak_summary("u", at(5), 30).unwrap();
    assert_eq!(summary.current_streak, 1);
    assert_eq!(summary.longest_streak, 3);
    assert_eq!(summary.total_completed, 4);

    let stats = tracker.stats("u", at(5), 7).unwrap();
    assert_eq!(stats.total_watch_time, WatchTime::from_minutes(40));
    assert_eq!(stats.videos_completed, 4);
}

#[test]
fn test_goal_tracks_completions_across_playlists() {
    let db = setup();
    let second = PlaylistImport::from_json(
        r#"{
            "id": "PLgo",
            "title": "Go",
            "videos": [{"id": "g1", "title": "Intro", "duration": "PT5M"}]
        }"#,
    )
    .unwrap()
    .into_playlist("u", day(1), 1)
    .unwrap();
    db.insert_playlist(&second).unwrap();

    let tracker = ProgressTracker::new(&db);
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    tracker.set_goal("u", day(1), 2).unwrap();

    tracker.complete_video("PLrust", "v1", now).unwrap();
    let outcome = tracker
        .complete_video("PLgo", "g1", now + TimeDelta::minutes(30))
        .unwrap();
    assert_eq!(outcome.videos_completed_today, 2);
    assert!(outcome.goal.is_completed);

    let stored = db.find_goal("u", day(1)).unwrap().unwrap();
    assert_eq!(stored.videos_completed(), 2);
    assert!(stored.is_completed());

    let history = tracker.goal_history("u", day(1), 7).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].completion_rate, 100.0);
}

#[test]
fn test_due_set_shrinks_as_videos_are_watched() {
    let db = setup();
    let tracker = ProgressTracker::new(&db);
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

    let playlist = db.load_playlist("PLrust").unwrap();
    let before = SchedulePlanner::new(&playlist).videos_for_day(day(1)).len();
    assert_eq!(before, 2);

    tracker.complete_video("PLrust", "v1", now).unwrap();
    let playlist = db.load_playlist("PLrust").unwrap();
    let due: Vec<&str> = SchedulePlanner::new(&playlist)
        .videos_for_day(day(1))
        .iter()
        .map(|v| v.id.as_str())
        .collect();
    assert_eq!(due, ["v2"]);

    let dash = tracker.dashboard("u", day(1), day(1)).unwrap();
    assert_eq!(dash.current_streak, 1);
    assert_eq!(dash.playlists[0].due_today, 1);
}

#[test]
fn test_unknown_ids_are_reported() {
    let db = setup();
    let tracker = ProgressTracker::new(&db);
    let now = Utc::now();
    assert!(tracker.complete_video("missing", "v1", now).is_err());
    assert!(tracker.complete_video("PLrust", "missing", now).is_err());
    assert_eq!(db.completions_on("u", now.date_naive()).unwrap(), 0);
}

#[test]
fn test_reimporting_an_export_keeps_existing_progress() {
    let db = setup();
    let tracker = ProgressTracker::new(&db);
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    tracker.complete_video("PLrust", "v1", now).unwrap();

    let again = PlaylistImport::from_json(EXPORT)
        .unwrap()
        .into_playlist("someone-else", day(3), 7)
        .unwrap();
    assert!(matches!(
        db.insert_playlist(&again),
        Err(CoreError::Validation(ValidationError::AlreadyExists { .. }))
    ));

    let stored = db.load_playlist("PLrust").unwrap();
    assert_eq!(stored.user_id, "u");
    assert_eq!(stored.start_date, day(1));
    assert_eq!(stored.completed_count(), 1);
    assert_eq!(db.completed_totals("u").unwrap().0, 1);
    assert!(db.list_playlists("someone-else").unwrap().is_empty());
}
