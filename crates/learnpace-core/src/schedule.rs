//! Daily watch schedule for a playlist.
//!
//! The planner spreads a playlist's total watch time evenly over its target
//! window. Two views are derived from that pace:
//!
//! - [`SchedulePlanner::daily_schedule`] cuts the position-ordered videos
//!   into day buckets, closing a bucket once it reaches the daily target.
//! - [`SchedulePlanner::videos_for_day`] returns the videos that should be
//!   watched by a given date given what has already been completed.
//!
//! Nothing here is cached; every call recomputes from the playlist so that a
//! completion or a corrected duration is reflected immediately.
//!
//! Completed videos always count toward the pace in the due-set walk, even
//! when they sit later in the playlist than unwatched ones. Watching ahead can
//! therefore shrink or empty today's list, and skipping around can pull later
//! videos into it. This is deliberate and covered by tests.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::duration::WatchTime;
use crate::playlist::{Playlist, Video};

/// The videos assigned to one schedule day.
#[derive(Debug, Clone, Serialize)]
pub struct DayBucket<'a> {
    /// 0-based offset from the playlist start date
    pub day_index: u32,
    pub date: NaiveDate,
    pub total_duration: WatchTime,
    pub videos: &'a [Video],
}

/// The full partition of a playlist into day buckets.
#[derive(Debug, Clone, Serialize)]
pub struct DailySchedule<'a> {
    pub daily_target: WatchTime,
    pub days: Vec<DayBucket<'a>>,
}

impl<'a> DailySchedule<'a> {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day(&self, day_index: u32) -> Option<&DayBucket<'a>> {
        self.days.iter().find(|b| b.day_index == day_index)
    }

    /// All scheduled videos in day order.
    pub fn videos(&self) -> impl Iterator<Item = &'a Video> + '_ {
        self.days.iter().flat_map(|b| b.videos.iter())
    }
}

/// What is due on a single date.
#[derive(Debug, Clone, Serialize)]
pub struct DayPlan<'a> {
    pub date: NaiveDate,
    /// `None` before the schedule starts
    pub day_index: Option<u32>,
    pub daily_target: WatchTime,
    pub due: Vec<&'a Video>,
    pub due_duration: WatchTime,
    /// Videos in this playlist whose completion timestamp falls on `date`
    pub completed_on_date: usize,
}

/// Computes schedules for one playlist at its current pace.
#[derive(Debug, Clone, Copy)]
pub struct SchedulePlanner<'a> {
    playlist: &'a Playlist,
    daily_target: WatchTime,
}

impl<'a> SchedulePlanner<'a> {
    pub fn new(playlist: &'a Playlist) -> Self {
        let daily_target = playlist
            .total_duration()
            .div_round(playlist.target_completion_days());
        Self {
            playlist,
            daily_target,
        }
    }

    /// Watch time per day needed to finish on target.
    pub fn daily_target(&self) -> WatchTime {
        self.daily_target
    }

    /// Partition the playlist into day buckets.
    ///
    /// A bucket closes as soon as its accumulated duration reaches the daily
    /// target. Leftover videos form one final bucket, so uneven durations can
    /// produce more buckets than target days. A zero daily target (all
    /// durations zero) puts every video into a single bucket.
    pub fn daily_schedule(&self) -> DailySchedule<'a> {
        let videos = self.playlist.videos();
        let mut days = Vec::new();

        if self.daily_target.is_zero() {
            if !videos.is_empty() {
                days.push(self.bucket(0, videos, WatchTime::ZERO));
            }
        } else {
            let mut start = 0;
            let mut accumulated = WatchTime::ZERO;
            for (i, video) in videos.iter().enumerate() {
                accumulated += video.duration;
                if accumulated >= self.daily_target {
                    days.push(self.bucket(days.len() as u32, &videos[start..=i], accumulated));
                    start = i + 1;
                    accumulated = WatchTime::ZERO;
                }
            }
            if start < videos.len() {
                days.push(self.bucket(days.len() as u32, &videos[start..], accumulated));
            }
        }

        tracing::debug!(
            playlist_id = %self.playlist.id,
            buckets = days.len(),
            target_days = self.playlist.target_completion_days().get(),
            "computed daily schedule"
        );

        DailySchedule {
            daily_target: self.daily_target,
            days,
        }
    }

    /// Videos due by the end of `date` under a linear pace.
    ///
    /// Empty before the start date. Otherwise walks the playlist in order
    /// with a running total: completed videos add their duration and are
    /// skipped, unwatched videos are due while the running total is below
    /// `daily_target * (days_elapsed + 1)`.
    pub fn videos_for_day(&self, date: NaiveDate) -> Vec<&'a Video> {
        let Some(day_index) = self.day_index(date) else {
            return Vec::new();
        };
        let target_cumulative = self.daily_target * day_index.saturating_add(1);

        let mut running = WatchTime::ZERO;
        let mut due = Vec::new();
        for video in self.playlist.videos() {
            if video.is_completed() {
                running += video.duration;
                continue;
            }
            if running < target_cumulative {
                due.push(video);
                running += video.duration;
            } else {
                break;
            }
        }
        due
    }

    /// Due videos for `date` plus the day's completion count.
    pub fn day_plan(&self, date: NaiveDate) -> DayPlan<'a> {
        let due = self.videos_for_day(date);
        let due_duration = due.iter().map(|v| v.duration).sum();
        let completed_on_date = self
            .playlist
            .videos()
            .iter()
            .filter(|v| v.completed_at.is_some_and(|at| at.date_naive() == date))
            .count();

        DayPlan {
            date,
            day_index: self.day_index(date),
            daily_target: self.daily_target,
            due,
            due_duration,
            completed_on_date,
        }
    }

    fn day_index(&self, date: NaiveDate) -> Option<u32> {
        let elapsed = (date - self.playlist.start_date).num_days();
        if elapsed < 0 {
            return None;
        }
        Some(u32::try_from(elapsed).unwrap_or(u32::MAX))
    }

    fn bucket(&self, day_index: u32, videos: &'a [Video], total: WatchTime) -> DayBucket<'a> {
        let date = self
            .playlist
            .start_date
            .checked_add_days(Days::new(u64::from(day_index)))
            .unwrap_or(NaiveDate::MAX);
        DayBucket {
            day_index,
            date,
            total_duration: total,
            videos,
        }
    }
}
