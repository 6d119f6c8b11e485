use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::goals::GoalStatus;
use crate::streak::StreakTransition;

/// Domain events published by one aggregate and consumed by another.
///
/// Completing a video never touches streak or goal state directly; the
/// playlist publishes [`Event::VideoCompleted`] and the tracker routes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    VideoCompleted {
        user_id: String,
        playlist_id: String,
        video_id: String,
        at: DateTime<Utc>,
    },
    StreakUpdated {
        user_id: String,
        transition: StreakTransition,
        current_streak: u32,
        longest_streak: u32,
        on: NaiveDate,
    },
    DailyGoalUpdated {
        user_id: String,
        status: GoalStatus,
        on: NaiveDate,
    },
}

impl Event {
    /// Calendar date (UTC) the event counts toward.
    pub fn activity_date(&self) -> NaiveDate {
        match self {
            Event::VideoCompleted { at, .. } => at.date_naive(),
            Event::StreakUpdated { on, .. } | Event::DailyGoalUpdated { on, .. } => *on,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Event::VideoCompleted { user_id, .. }
            | Event::StreakUpdated { user_id, .. }
            | Event::DailyGoalUpdated { user_id, .. } => user_id,
        }
    }
}
