//! Daily goals: videos planned vs. videos completed per user and day.
//!
//! Goals are created lazily on first touch, seeded with the reconciler's
//! default planned count (zero unless configured). The completed count is
//! always overwritten with an absolute figure from the store (videos
//! completed that day across all playlists), never incremented, so
//! reconciling twice gives the same result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::store::GoalStore;

/// Planned/completed counts and the derived flag, as published in events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStatus {
    pub videos_planned: u32,
    pub videos_completed: u32,
    pub is_completed: bool,
}

/// One user's goal for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyGoal {
    user_id: String,
    date: NaiveDate,
    videos_planned: u32,
    videos_completed: u32,
    is_completed: bool,
    /// Not yet stored
    #[serde(skip)]
    fresh: bool,
}

impl DailyGoal {
    /// A fresh, unstored goal with nothing planned.
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        let mut goal = Self::restore(user_id, date, 0, 0);
        goal.fresh = true;
        goal
    }

    /// Rebuild a goal from stored counts; the flag is recomputed.
    pub fn restore(
        user_id: impl Into<String>,
        date: NaiveDate,
        videos_planned: u32,
        videos_completed: u32,
    ) -> Self {
        let mut goal = Self {
            user_id: user_id.into(),
            date,
            videos_planned,
            videos_completed,
            is_completed: false,
            fresh: false,
        };
        goal.refresh();
        goal
    }

    /// True for a goal built by [`DailyGoal::new`] that no store has
    /// returned yet.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Mark the goal as written by a store.
    pub(crate) fn stored(mut self) -> Self {
        self.fresh = false;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn videos_planned(&self) -> u32 {
        self.videos_planned
    }

    pub fn videos_completed(&self) -> u32 {
        self.videos_completed
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn status(&self) -> GoalStatus {
        GoalStatus {
            videos_planned: self.videos_planned,
            videos_completed: self.videos_completed,
            is_completed: self.is_completed,
        }
    }

    /// Record today's completed count.
    pub fn update_progress(&mut self, completed_count: u32) -> GoalStatus {
        self.videos_completed = completed_count;
        self.refresh();
        tracing::info!(
            user_id = %self.user_id,
            date = %self.date,
            completed = self.videos_completed,
            planned = self.videos_planned,
            is_completed = self.is_completed,
            "daily goal progress updated"
        );
        self.status()
    }

    /// Change the planned count; the completed count is left alone.
    pub fn set_planned(&mut self, videos_planned: u32) -> GoalStatus {
        self.videos_planned = videos_planned;
        self.refresh();
        self.status()
    }

    /// `completed / planned * 100`, or 0 with nothing planned.
    pub fn completion_rate(&self) -> f64 {
        if self.videos_planned == 0 {
            return 0.0;
        }
        f64::from(self.videos_completed) / f64::from(self.videos_planned) * 100.0
    }

    fn refresh(&mut self) {
        self.is_completed = self.videos_planned > 0 && self.videos_completed >= self.videos_planned;
    }
}

/// Convert an untrusted count into a goal count.
///
/// # Errors
/// Returns a [`ValidationError`] for negative or oversized values.
pub fn validate_count(field: &str, value: i64) -> Result<u32, ValidationError> {
    u32::try_from(value).map_err(|_| {
        ValidationError::invalid_value(
            field,
            format!("expected a count between 0 and {}, got {value}", u32::MAX),
        )
    })
}

/// One row of the goal history chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGoalStat {
    pub date: NaiveDate,
    /// Percentage rounded to one decimal place
    pub completion_rate: f64,
    pub videos_completed: u32,
    pub videos_planned: u32,
}

impl From<&DailyGoal> for DailyGoalStat {
    fn from(goal: &DailyGoal) -> Self {
        Self {
            date: goal.date,
            completion_rate: (goal.completion_rate() * 10.0).round() / 10.0,
            videos_completed: goal.videos_completed,
            videos_planned: goal.videos_planned,
        }
    }
}

/// Completion-rate series for a set of goals, oldest first.
pub fn daily_stats(goals: &[DailyGoal]) -> Vec<DailyGoalStat> {
    let mut stats: Vec<DailyGoalStat> = goals.iter().map(DailyGoalStat::from).collect();
    stats.sort_by_key(|s| s.date);
    stats
}

/// Reconciles goals against a [`GoalStore`].
///
/// Each operation is a single atomic read-modify-write in the store, so
/// concurrent completions for the same user and day serialize there.
#[derive(Debug)]
pub struct GoalReconciler<'s, S: GoalStore + ?Sized> {
    store: &'s S,
    default_planned: u32,
}

impl<'s, S: GoalStore + ?Sized> GoalReconciler<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            default_planned: 0,
        }
    }

    /// Plan `videos_planned` videos on goals this reconciler creates.
    pub fn with_default_planned(mut self, videos_planned: u32) -> Self {
        self.default_planned = videos_planned;
        self
    }

    /// Seed a fresh goal with the default plan.
    pub fn seed(&self, goal: &mut DailyGoal) {
        if goal.is_fresh() && self.default_planned > 0 {
            goal.set_planned(self.default_planned);
        }
    }

    /// Seed `goal` if fresh and overwrite its completed count.
    pub fn apply_completed(&self, goal: &mut DailyGoal, completed: u32) -> GoalStatus {
        self.seed(goal);
        goal.update_progress(completed)
    }

    /// The goal for `(user_id, date)`, created with the default plan if absent.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn get_or_create(&self, user_id: &str, date: NaiveDate) -> Result<DailyGoal> {
        self.store
            .modify_goal(user_id, date, &mut |goal| self.seed(goal))
    }

    /// Overwrite the completed count for `(user_id, date)`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn reconcile(
        &self,
        user_id: &str,
        date: NaiveDate,
        completed_today: u32,
    ) -> Result<DailyGoal> {
        self.store.modify_goal(user_id, date, &mut |goal| {
            self.apply_completed(goal, completed_today);
        })
    }

    /// Set how many videos are planned for `(user_id, date)`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn set_planned(
        &self,
        user_id: &str,
        date: NaiveDate,
        videos_planned: u32,
    ) -> Result<DailyGoal> {
        self.store.modify_goal(user_id, date, &mut |goal| {
            goal.set_planned(videos_planned);
        })
    }

    /// Completion-rate series for goals on or after `since`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn history(&self, user_id: &str, since: NaiveDate) -> Result<Vec<DailyGoalStat>> {
        Ok(daily_stats(&self.store.goals_since(user_id, since)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[derive(Default)]
    struct MemoryGoals {
        goals: RefCell<HashMap<(String, NaiveDate), DailyGoal>>,
    }

    impl GoalStore for MemoryGoals {
        fn find_goal(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyGoal>> {
            Ok(self.goals.borrow().get(&(user_id.to_string(), date)).cloned())
        }

        fn goals_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<DailyGoal>> {
            Ok(self
                .goals
                .borrow()
                .values()
                .filter(|g| g.user_id() == user_id && g.date() >= since)
                .cloned()
                .collect())
        }

        fn modify_goal(
            &self,
            user_id: &str,
            date: NaiveDate,
            f: &mut dyn FnMut(&mut DailyGoal),
        ) -> Result<DailyGoal> {
            let mut goals = self.goals.borrow_mut();
            let key = (user_id.to_string(), date);
            let mut goal = goals
                .get(&key)
                .cloned()
                .unwrap_or_else(|| DailyGoal::new(user_id, date));
            f(&mut goal);
            let goal = goal.stored();
            goals.insert(key, goal.clone());
            Ok(goal)
        }
    }

    #[test]
    fn planned_five_completed_five_is_done() {
        let goal = DailyGoal::restore("u", date(2024, 1, 1), 5, 5);
        assert!(goal.is_completed());
    }

    #[test]
    fn nothing_planned_is_never_done() {
        let mut goal = DailyGoal::new("u", date(2024, 1, 1));
        for completed in [0, 1, 10] {
            assert!(!goal.update_progress(completed).is_completed);
        }
        assert_eq!(goal.completion_rate(), 0.0);
    }

    #[test]
    fn planned_changes_keep_completed_count() {
        let mut goal = DailyGoal::new("u", date(2024, 1, 1));
        goal.update_progress(3);
        let status = goal.set_planned(2);
        assert_eq!(status.videos_completed, 3);
        assert!(status.is_completed);
        let status = goal.set_planned(4);
        assert_eq!(status.videos_completed, 3);
        assert!(!status.is_completed);
    }

    #[test]
    fn validate_count_rejects_negative() {
        assert!(validate_count("videos_planned", -1).is_err());
        assert_eq!(validate_count("videos_planned", 7).unwrap(), 7);
    }

    #[test]
    fn stats_round_to_one_decimal() {
        let goals = vec![
            DailyGoal::restore("u", date(2024, 1, 2), 3, 1),
            DailyGoal::restore("u", date(2024, 1, 1), 0, 4),
        ];
        let stats = daily_stats(&goals);
        assert_eq!(stats[0].date, date(2024, 1, 1));
        assert_eq!(stats[0].completion_rate, 0.0);
        assert_eq!(stats[1].completion_rate, 33.3);
    }

    #[test]
    fn reconciler_creates_lazily_and_overwrites() {
        let store = MemoryGoals::default();
        let reconciler = GoalReconciler::new(&store);
        let today = date(2024, 1, 1);

        assert!(store.find_goal("u", today).unwrap().is_none());
        let goal = reconciler.get_or_create("u", today).unwrap();
        assert_eq!(goal.videos_planned(), 0);

        reconciler.set_planned("u", today, 2).unwrap();
        reconciler.reconcile("u", today, 1).unwrap();
        let goal = reconciler.reconcile("u", today, 2).unwrap();
        assert_eq!(goal.videos_completed(), 2);
        assert!(goal.is_completed());

        let history = reconciler.history("u", today).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].completion_rate, 100.0);
    }

    #[test]
    fn default_plan_seeds_only_new_goals() {
        let store = MemoryGoals::default();
        let reconciler = GoalReconciler::new(&store).with_default_planned(3);
        let today = date(2024, 1, 1);

        let goal = reconciler.reconcile("u", today, 1).unwrap();
        assert_eq!(goal.videos_planned(), 3);
        assert!(!goal.is_completed());

        reconciler.set_planned("u", today, 0).unwrap();
        let goal = reconciler.reconcile("u", today, 2).unwrap();
        assert_eq!(goal.videos_planned(), 0);
        assert!(!store.find_goal("u", today).unwrap().unwrap().is_fresh());
    }
}
