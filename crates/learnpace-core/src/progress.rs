//! Completion percentages and a linear finish-date estimate.
//!
//! The estimate extrapolates the average daily percentage gained since the
//! start date. It has no smoothing or outlier handling; a better estimator
//! should replace [`estimate_completion`] outright rather than tune it.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::duration::WatchTime;
use crate::playlist::Playlist;
use crate::schedule::SchedulePlanner;

/// Snapshot of how far through a playlist the user is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub playlist_id: String,
    pub video_count: usize,
    pub completed_count: usize,
    pub remaining_count: usize,
    pub total_duration: WatchTime,
    pub completed_duration: WatchTime,
    /// Share of videos completed, 0..=100
    pub progress_percentage: f64,
    /// Share of watch time completed, 0..=100
    pub duration_progress: f64,
    pub daily_target: WatchTime,
    pub estimated_completion: Option<NaiveDate>,
}

impl ProgressReport {
    /// Compute the report for `playlist` as of `today`.
    pub fn compute(playlist: &Playlist, today: NaiveDate) -> Self {
        let completed_count = playlist.completed_count();
        let video_count = playlist.video_count();
        let total_duration = playlist.total_duration();
        let completed_duration = playlist.completed_duration();
        let progress = progress_percentage(completed_count, video_count);

        Self {
            playlist_id: playlist.id.clone(),
            video_count,
            completed_count,
            remaining_count: video_count - completed_count,
            total_duration,
            completed_duration,
            progress_percentage: progress,
            duration_progress: duration_progress(completed_duration, total_duration),
            daily_target: SchedulePlanner::new(playlist).daily_target(),
            estimated_completion: estimate_completion(
                progress,
                video_count - completed_count,
                playlist.start_date,
                today,
            ),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.video_count > 0 && self.remaining_count == 0
    }
}

/// `completed / total * 100`, or 0 for an empty playlist.
pub fn progress_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

/// `completed / total * 100` by watch time, or 0 when the total is zero.
pub fn duration_progress(completed: WatchTime, total: WatchTime) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    completed.as_secs_f64() / total.as_secs_f64() * 100.0
}

/// Project a finish date from the average daily progress so far.
///
/// Only defined while videos remain, progress is positive and at least one
/// full day has elapsed since `start_date`. The fractional part of the
/// remaining days is dropped, so the estimate is the last whole day reached
/// at the current rate.
pub fn estimate_completion(
    progress_percentage: f64,
    remaining_count: usize,
    start_date: NaiveDate,
    today: NaiveDate,
) -> Option<NaiveDate> {
    if remaining_count == 0 || progress_percentage <= 0.0 {
        return None;
    }
    let days_elapsed = (today - start_date).num_days();
    if days_elapsed <= 0 {
        return None;
    }
    let completion_rate = progress_percentage / days_elapsed as f64;
    if completion_rate <= 0.0 {
        return None;
    }
    let days_remaining = (100.0 - progress_percentage) / completion_rate;
    if !days_remaining.is_finite() || days_remaining < 0.0 {
        return None;
    }
    today.checked_add_days(Days::new(days_remaining.floor() as u64))
}
