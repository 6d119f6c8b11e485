//! # learnpace Core Library
//!
//! Core logic for learnpace, a paced study planner for video playlists.
//! All operations are exposed through the standalone `learnpace` CLI, which
//! is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Schedule**: splits a playlist into day buckets and computes what is
//!   due on a date under a linear pace
//! - **Progress**: completion percentages and an estimated finish date
//! - **Streaks and goals**: consecutive-day streaks and per-day goals,
//!   driven by [`Event::VideoCompleted`]
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`SchedulePlanner`]: daily buckets and the videos due on a date
//! - [`ProgressReport`]: progress for one playlist
//! - [`StreakState`] / [`StreakSummary`]: incremental and recomputed streaks
//! - [`ProgressTracker`]: the service that routes completions
//! - [`Database`]: implementation of the store traits

pub mod duration;
pub mod error;
pub mod events;
pub mod goals;
pub mod import;
pub mod playlist;
pub mod progress;
pub mod schedule;
pub mod session;
pub mod storage;
pub mod store;
pub mod streak;
pub mod tracker;

pub use duration::WatchTime;
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use goals::{DailyGoal, DailyGoalStat, GoalReconciler, GoalStatus};
pub use import::PlaylistImport;
pub use playlist::{Playlist, Video};
pub use progress::ProgressReport;
pub use schedule::{DailySchedule, DayBucket, DayPlan, SchedulePlanner};
pub use session::LearningSession;
pub use storage::{Config, Database};
pub use store::{CommittedCompletion, CompletionStore, GoalStore, PlaylistStore, StreakStore};
pub use streak::{StreakState, StreakSummary, StreakTransition};
pub use tracker::{CompletionOutcome, Dashboard, LearningStats, ProgressTracker};
