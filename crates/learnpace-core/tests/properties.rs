//! Property tests for scheduling, progress and streak invariants.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate, TimeZone, Utc};
use learnpace_core::progress::progress_percentage;
use learnpace_core::streak::streaks_from_dates;
use learnpace_core::{Playlist, SchedulePlanner, StreakState, StreakSummary, Video, WatchTime};
use proptest::prelude::*;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn playlist(target_days: u32, secs: &[u64]) -> Playlist {
    let videos = secs
        .iter()
        .enumerate()
        .map(|(i, s)| Video::new(format!("v{i}"), "", i as i64, WatchTime::from_secs(*s)))
        .collect();
    Playlist::new("p", "u", "t", start(), target_days, videos).unwrap()
}

proptest! {
    #[test]
    fn schedule_is_an_ordered_partition(
        secs in prop::collection::vec(0u64..7200, 0..40),
        target_days in 1u32..60,
    ) {
        let p = playlist(target_days, &secs);
        let planner = SchedulePlanner::new(&p);
        let schedule = planner.daily_schedule();

        let flat: Vec<&str> = schedule.videos().map(|v| v.id.as_str()).collect();
        let all: Vec<&str> = p.videos().iter().map(|v| v.id.as_str()).collect();
        prop_assert_eq!(flat, all);

        for (i, bucket) in schedule.days.iter().enumerate() {
            prop_assert_eq!(bucket.day_index as usize, i);
            prop_assert!(!bucket.videos.is_empty());
            // every bucket but the last reaches the target
            if i + 1 < schedule.len() {
                prop_assert!(bucket.total_duration >= schedule.daily_target);
            }
        }
    }

    #[test]
    fn progress_stays_in_range(completed in 0usize..500, extra in 0usize..500) {
        let pct = progress_percentage(completed, completed + extra);
        prop_assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn same_day_activity_keeps_current(offsets in prop::collection::vec(0u64..20, 1..30)) {
        let mut state = StreakState::new();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        for offset in sorted {
            let date = start() + Days::new(offset);
            state.record_activity(date);
            let before = state.current_streak();
            state.record_activity(date);
            prop_assert_eq!(state.current_streak(), before);
        }
    }

    #[test]
    fn longest_never_decreases(offsets in prop::collection::vec(0u64..60, 1..40)) {
        let mut state = StreakState::new();
        let mut longest = 0;
        for offset in offsets {
            state.record_activity(start() + Days::new(offset));
            prop_assert!(state.longest_streak() >= longest);
            prop_assert!(state.longest_streak() >= state.current_streak());
            longest = state.longest_streak();
        }
    }

    #[test]
    fn incremental_and_recomputed_streaks_agree(
        offsets in prop::collection::btree_set(0u64..45, 1..30),
    ) {
        let dates: BTreeSet<NaiveDate> = offsets.iter().map(|o| start() + Days::new(*o)).collect();

        let mut state = StreakState::new();
        for date in &dates {
            state.record_activity(*date);
        }

        let last = *dates.iter().next_back().unwrap();
        let (current, longest) = streaks_from_dates(&dates, last);
        prop_assert_eq!(state.current_streak(), current);
        prop_assert_eq!(state.longest_streak(), longest);

        let now = Utc.from_utc_datetime(&last.and_hms_opt(23, 0, 0).unwrap());
        let history = dates
            .iter()
            .map(|d| Utc.from_utc_datetime(&d.and_hms_opt(12, 0, 0).unwrap()));
        let summary = StreakSummary::from_history(history, now, 60);
        prop_assert_eq!(summary.current_streak, current);
        prop_assert_eq!(summary.longest_streak, longest);
        prop_assert_eq!(summary.total_completed, dates.len());
    }
}
