//! Consecutive-day learning streaks.
//!
//! Two computations live here:
//!
//! - [`StreakState::record_activity`] is the incremental transition applied
//!   once per completion event. It only needs the last activity date.
//! - [`StreakSummary::from_history`] rebuilds current and longest streaks
//!   from raw completion timestamps inside a lookback window. It is
//!   idempotent and safe to replay, so it is the source of truth when the
//!   two disagree (for example after out-of-order events).
//!
//! For in-order event histories both agree on the longest streak, and on the
//! current streak when the last activity is today.

use std::collections::BTreeSet;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::Event;

/// Which branch of the streak transition an event took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// First recorded activity
    Started,
    /// Activity on the day after the last one
    Extended,
    /// Activity after a gap of more than one day
    Reset,
    /// Another activity on the last recorded day
    SameDay,
    /// Activity dated before the last recorded day; ignored
    OutOfOrder,
}

/// Stored streak counters for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreakState {
    current_streak: u32,
    longest_streak: u32,
    last_activity_date: Option<NaiveDate>,
}

impl StreakState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state loaded from storage.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if `longest_streak < current_streak`, or
    /// if counters are non-zero without a last activity date.
    pub fn restore(
        current_streak: u32,
        longest_streak: u32,
        last_activity_date: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        if longest_streak < current_streak {
            return Err(ValidationError::invalid_value(
                "longest_streak",
                format!("{longest_streak} is below current streak {current_streak}"),
            ));
        }
        if last_activity_date.is_none() && current_streak > 0 {
            return Err(ValidationError::invalid_value(
                "last_activity_date",
                "missing for a non-zero streak",
            ));
        }
        Ok(Self {
            current_streak,
            longest_streak,
            last_activity_date,
        })
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    pub fn last_activity_date(&self) -> Option<NaiveDate> {
        self.last_activity_date
    }

    /// Apply one activity on `date`.
    ///
    /// An event dated before the last activity changes nothing, including the
    /// last activity date: late deliveries never move the watermark back.
    pub fn record_activity(&mut self, date: NaiveDate) -> StreakTransition {
        let Some(last) = self.last_activity_date else {
            self.current_streak = 1;
            self.longest_streak = self.longest_streak.max(1);
            self.last_activity_date = Some(date);
            return StreakTransition::Started;
        };

        let transition = match (date - last).num_days() {
            0 => StreakTransition::SameDay,
            1 => {
                self.current_streak = self.current_streak.saturating_add(1);
                StreakTransition::Extended
            }
            gap if gap > 1 => {
                self.current_streak = 1;
                StreakTransition::Reset
            }
            _ => {
                tracing::warn!(%date, %last, "ignoring activity dated before last recorded day");
                return StreakTransition::OutOfOrder;
            }
        };

        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_activity_date = Some(date);
        transition
    }

    /// Route a domain event; only completions affect the streak.
    pub fn apply(&mut self, event: &Event) -> Option<StreakTransition> {
        match event {
            Event::VideoCompleted { .. } => Some(self.record_activity(event.activity_date())),
            _ => None,
        }
    }

    /// The streak as it should be shown on `today`: still running if the last
    /// activity was today or yesterday, otherwise zero.
    pub fn current_as_of(&self, today: NaiveDate) -> u32 {
        match self.last_activity_date {
            Some(last) if (today - last).num_days() <= 1 => self.current_streak,
            _ => 0,
        }
    }
}

/// Streaks recomputed from completion history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Completions inside the lookback window
    pub total_completed: usize,
}

impl StreakSummary {
    /// Recompute streaks from completion timestamps.
    ///
    /// Only completions at or after `now - lookback_days` count. The current
    /// streak walks back from `now`'s date; the longest streak scans the
    /// distinct dates newest first.
    pub fn from_history<I>(completions: I, now: DateTime<Utc>, lookback_days: u32) -> Self
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let cutoff = now - chrono::TimeDelta::days(i64::from(lookback_days));
        let mut total_completed = 0;
        let mut dates = BTreeSet::new();
        for at in completions.into_iter().filter(|at| *at >= cutoff) {
            total_completed += 1;
            dates.insert(at.date_naive());
        }

        let (current_streak, longest_streak) = streaks_from_dates(&dates, now.date_naive());
        Self {
            current_streak,
            longest_streak,
            total_completed,
        }
    }
}

/// `(current, longest)` for a set of active dates as seen from `today`.
pub fn streaks_from_dates(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> (u32, u32) {
    let mut current = 0u32;
    let mut day = Some(today);
    while let Some(d) = day.filter(|d| dates.contains(d)) {
        current += 1;
        day = d.checked_sub_days(Days::new(1));
    }

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut newer: Option<NaiveDate> = None;
    for &date in dates.iter().rev() {
        run = match newer {
            Some(n) if (n - date).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        newer = Some(date);
    }

    (current, longest)
}
