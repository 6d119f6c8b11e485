//! Wires the playlist, streak and goal engines to their stores.
//!
//! [`ProgressTracker::complete_video`] is the only write path for
//! completions. The playlist publishes [`Event::VideoCompleted`]; the
//! tracker routes it to the streak and the day's goal inside one
//! [`CompletionStore::commit_completion`], then returns every resulting
//! event in publication order.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::Serialize;

use crate::duration::WatchTime;
use crate::error::Result;
use crate::events::Event;
use crate::goals::{DailyGoal, DailyGoalStat, GoalReconciler, GoalStatus};
use crate::playlist::Playlist;
use crate::progress::ProgressReport;
use crate::schedule::SchedulePlanner;
use crate::store::{CompletionStore, GoalStore, PlaylistStore, StreakStore};
use crate::streak::{StreakState, StreakSummary, StreakTransition};

/// Everything that changed because one video was completed.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    /// Empty when the video had already been completed.
    pub events: Vec<Event>,
    pub progress: ProgressReport,
    pub streak: StreakState,
    pub goal: GoalStatus,
    pub videos_completed_today: u32,
}

/// One line of the dashboard's playlist list.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub title: String,
    pub progress_percentage: f64,
    pub due_today: usize,
    pub due_today_duration: WatchTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub user_id: String,
    pub date: NaiveDate,
    pub goal: GoalStatus,
    /// Zero once a full day has passed without activity.
    pub current_streak: u32,
    pub longest_streak: u32,
    pub playlists: Vec<PlaylistSummary>,
}

/// Lifetime totals plus the recent goal series.
#[derive(Debug, Clone, Serialize)]
pub struct LearningStats {
    pub total_watch_time: WatchTime,
    pub videos_completed: u32,
    pub completion_data: Vec<DailyGoalStat>,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Service facade over a store implementing every store trait.
#[derive(Debug)]
pub struct ProgressTracker<'s, S: ?Sized> {
    store: &'s S,
    default_planned: u32,
}

impl<'s, S> ProgressTracker<'s, S>
where
    S: PlaylistStore + StreakStore + GoalStore + CompletionStore + ?Sized,
{
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            default_planned: 0,
        }
    }

    /// Plan `videos_planned` videos on goals created by this tracker.
    pub fn with_default_planned(mut self, videos_planned: u32) -> Self {
        self.default_planned = videos_planned;
        self
    }

    fn goals(&self) -> GoalReconciler<'s, S> {
        GoalReconciler::new(self.store).with_default_planned(self.default_planned)
    }

    /// Mark a video watched at `now` and propagate the consequences.
    ///
    /// The timestamp, streak and goal are committed together. Completing a
    /// video twice is a no-op that returns the current state with no events.
    ///
    /// # Errors
    /// Returns [`crate::CoreError::NotFound`] for an unknown playlist or
    /// video, and propagates store failures. Nothing is written on error.
    pub fn complete_video(
        &self,
        playlist_id: &str,
        video_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let mut playlist = self.store.load_playlist(playlist_id)?;
        let today = now.date_naive();
        let user_id = playlist.user_id.clone();

        let Some(completed) = playlist.complete_video(video_id, now)? else {
            return self.unchanged(&playlist, today);
        };

        let reconciler = self.goals();
        let mut transition = None;
        let committed = self.store.commit_completion(
            &user_id,
            playlist_id,
            video_id,
            now,
            &mut |state| transition = state.apply(&completed),
            &mut |goal, completed_today| {
                reconciler.apply_completed(goal, completed_today);
            },
        )?;
        let Some(committed) = committed else {
            // completed by another writer since the load
            let playlist = self.store.load_playlist(playlist_id)?;
            return self.unchanged(&playlist, today);
        };

        let streak = committed.streak;
        let mut events = vec![completed];
        if let Some(transition) = transition.filter(|t| *t != StreakTransition::OutOfOrder) {
            tracing::info!(
                user_id = %user_id,
                ?transition,
                current = streak.current_streak(),
                longest = streak.longest_streak(),
                "streak updated"
            );
            events.push(Event::StreakUpdated {
                user_id: user_id.clone(),
                transition,
                current_streak: streak.current_streak(),
                longest_streak: streak.longest_streak(),
                on: today,
            });
        }

        let goal = committed.goal.status();
        events.push(Event::DailyGoalUpdated {
            user_id: user_id.clone(),
            status: goal,
            on: today,
        });

        Ok(CompletionOutcome {
            events,
            progress: ProgressReport::compute(&playlist, today),
            streak,
            goal,
            videos_completed_today: committed.completed_on_date,
        })
    }

    fn unchanged(&self, playlist: &Playlist, today: NaiveDate) -> Result<CompletionOutcome> {
        let user_id = &playlist.user_id;
        Ok(CompletionOutcome {
            events: Vec::new(),
            progress: ProgressReport::compute(playlist, today),
            streak: self.store.load_streak(user_id)?,
            goal: self.goal_status(user_id, today, today)?,
            videos_completed_today: self.store.completions_on(user_id, today)?,
        })
    }

    /// The goal for `date` as seen on `today`.
    ///
    /// Days up to `today` are reconciled against the store and saved. A
    /// future day is only read: its stored goal if one was set, otherwise
    /// the default an untouched goal would start with.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn goal_status(
        &self,
        user_id: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<GoalStatus> {
        if date <= today {
            let completed = self.store.completions_on(user_id, date)?;
            return Ok(self.goals().reconcile(user_id, date, completed)?.status());
        }
        if let Some(goal) = self.store.find_goal(user_id, date)? {
            return Ok(goal.status());
        }
        let mut goal = DailyGoal::new(user_id, date);
        self.goals().seed(&mut goal);
        Ok(goal.status())
    }

    /// The goal, streak and due videos for `date`, viewed on `today`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn dashboard(&self, user_id: &str, date: NaiveDate, today: NaiveDate) -> Result<Dashboard> {
        let goal = self.goal_status(user_id, date, today)?;
        let streak = self.store.load_streak(user_id)?;

        let playlists = self
            .store
            .list_playlists(user_id)?
            .iter()
            .map(|playlist| {
                let plan = SchedulePlanner::new(playlist).day_plan(date);
                PlaylistSummary {
                    id: playlist.id.clone(),
                    title: playlist.title.clone(),
                    progress_percentage: ProgressReport::compute(playlist, date)
                        .progress_percentage,
                    due_today: plan.due.len(),
                    due_today_duration: plan.due_duration,
                }
            })
            .collect();

        Ok(Dashboard {
            user_id: user_id.to_string(),
            date,
            goal,
            current_streak: streak.current_as_of(today),
            longest_streak: streak.longest_streak(),
            playlists,
        })
    }

    /// Set the planned count for a day and refresh its completed count.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn set_goal(
        &self,
        user_id: &str,
        date: NaiveDate,
        videos_planned: u32,
    ) -> Result<DailyGoal> {
        let completed = self.store.completions_on(user_id, date)?;
        self.store.modify_goal(user_id, date, &mut |goal| {
            goal.set_planned(videos_planned);
            goal.update_progress(completed);
        })
    }

    /// Streaks recomputed from the last `lookback_days` of completions.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn streak_summary(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        lookback_days: u32,
    ) -> Result<StreakSummary> {
        let since = now - TimeDelta::days(i64::from(lookback_days));
        let completions = self.store.completions_since(user_id, since)?;
        Ok(StreakSummary::from_history(completions, now, lookback_days))
    }

    /// Completion-rate history for the last `window_days` days.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn goal_history(
        &self,
        user_id: &str,
        today: NaiveDate,
        window_days: u32,
    ) -> Result<Vec<DailyGoalStat>> {
        let since = today - TimeDelta::days(i64::from(window_days));
        GoalReconciler::new(self.store).history(user_id, since)
    }

    /// # Errors
    /// Propagates store failures.
    pub fn stats(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        window_days: u32,
    ) -> Result<LearningStats> {
        let today = now.date_naive();
        let (videos_completed, total_watch_time) = self.store.completed_totals(user_id)?;
        let streak = self.store.load_streak(user_id)?;

        Ok(LearningStats {
            total_watch_time,
            videos_completed,
            completion_data: self.goal_history(user_id, today, window_days)?,
            current_streak: streak.current_as_of(today),
            longest_streak: streak.longest_streak(),
        })
    }
}
