//! Interfaces to the stores the engine reads from and writes to.
//!
//! The scheduling and streak code never performs I/O itself; it is handed
//! fully loaded playlists and completion histories through these traits.
//! [`crate::storage::Database`] implements all of them on SQLite.
//!
//! # Atomicity
//!
//! [`StreakStore::modify_streak`] and [`GoalStore::modify_goal`] must run
//! their closure inside one atomic read-modify-write for the keyed record.
//! [`CompletionStore::commit_completion`] extends that to the whole
//! completion: the timestamp, the streak and the day's goal commit together
//! or not at all. The engine takes no locks of its own.

use chrono::{DateTime, NaiveDate, Utc};

use crate::duration::WatchTime;
use crate::error::Result;
use crate::goals::DailyGoal;
use crate::playlist::Playlist;
use crate::streak::StreakState;

/// Source of playlists, their videos and completion history.
pub trait PlaylistStore {
    /// Store a new playlist together with its videos.
    ///
    /// Returns [`crate::ValidationError::AlreadyExists`] if the id is taken;
    /// an existing playlist and its completion history are left untouched.
    fn insert_playlist(&self, playlist: &Playlist) -> Result<()>;

    /// Replace a stored playlist with an edited copy of itself.
    ///
    /// Returns [`crate::CoreError::NotFound`] for an unknown id.
    fn save_playlist(&self, playlist: &Playlist) -> Result<()>;

    /// Load a playlist with videos in position order.
    ///
    /// Returns [`crate::CoreError::NotFound`] for an unknown id.
    fn load_playlist(&self, playlist_id: &str) -> Result<Playlist>;

    fn list_playlists(&self, user_id: &str) -> Result<Vec<Playlist>>;

    fn delete_playlist(&self, playlist_id: &str) -> Result<()>;

    /// Videos the user completed on `date` across all playlists.
    fn completions_on(&self, user_id: &str, date: NaiveDate) -> Result<u32>;

    /// Completion timestamps at or after `since`, oldest first.
    fn completions_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>>;

    /// Count and summed duration of every completed video.
    fn completed_totals(&self, user_id: &str) -> Result<(u32, WatchTime)>;
}

/// Owner of each user's [`StreakState`].
pub trait StreakStore {
    /// The stored state, or a fresh one if the user has none yet.
    fn load_streak(&self, user_id: &str) -> Result<StreakState>;

    /// Atomically load, modify and store the user's streak.
    fn modify_streak(
        &self,
        user_id: &str,
        f: &mut dyn FnMut(&mut StreakState),
    ) -> Result<StreakState>;
}

/// Owner of [`DailyGoal`] records keyed by user and date.
pub trait GoalStore {
    fn find_goal(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyGoal>>;

    /// Goals on or after `since`, in any order.
    fn goals_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<DailyGoal>>;

    /// Atomically get-or-create the goal, apply `f`, and store it.
    fn modify_goal(
        &self,
        user_id: &str,
        date: NaiveDate,
        f: &mut dyn FnMut(&mut DailyGoal),
    ) -> Result<DailyGoal>;
}

/// What one committed completion left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedCompletion {
    pub streak: StreakState,
    pub goal: DailyGoal,
    /// Videos the user completed on the completion's date, this one included
    pub completed_on_date: u32,
}

/// Atomic write path for a single completion.
pub trait CompletionStore {
    /// In one atomic unit: set the video's completion timestamp to `at` if
    /// it is unset, apply `update_streak` to the user's streak, and hand the
    /// goal for `at`'s date to `update_goal` with the user's completed count
    /// for that date.
    ///
    /// Returns `Ok(None)` and writes nothing when the video was already
    /// completed. If any step fails nothing is written, so the call can be
    /// retried.
    ///
    /// Returns [`crate::CoreError::NotFound`] for an unknown video.
    fn commit_completion(
        &self,
        user_id: &str,
        playlist_id: &str,
        video_id: &str,
        at: DateTime<Utc>,
        update_streak: &mut dyn FnMut(&mut StreakState),
        update_goal: &mut dyn FnMut(&mut DailyGoal, u32),
    ) -> Result<Option<CommittedCompletion>>;
}
