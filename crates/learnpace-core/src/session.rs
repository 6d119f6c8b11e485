//! Learning sessions: a started/ended bracket around a sitting.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::WatchTime;
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningSession {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub videos_completed: u32,
    /// Wall-clock length, set when the session ends
    pub total_duration: Option<WatchTime>,
}

impl LearningSession {
    pub fn start(user_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            date: started_at.date_naive(),
            started_at,
            ended_at: None,
            videos_completed: 0,
            total_duration: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Close the session at `now`.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if the session already ended or `now`
    /// is before the start.
    pub fn end(
        &mut self,
        now: DateTime<Utc>,
        videos_completed: u32,
    ) -> Result<WatchTime, ValidationError> {
        if !self.is_open() {
            return Err(ValidationError::invalid_value("session", "already ended"));
        }
        let total = WatchTime::try_from_chrono(now - self.started_at).map_err(|_| {
            ValidationError::invalid_value("ended_at", "must not be before started_at")
        })?;
        self.ended_at = Some(now);
        self.videos_completed = videos_completed;
        self.total_duration = Some(total);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ending_records_wall_clock_length() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut session = LearningSession::start("u", start);
        assert!(session.is_open());
        assert_eq!(session.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let total = session.end(start + chrono::TimeDelta::minutes(45), 2).unwrap();
        assert_eq!(total, WatchTime::from_minutes(45));
        assert_eq!(session.videos_completed, 2);
        assert!(!session.is_open());
        assert!(session.end(start + chrono::TimeDelta::hours(2), 3).is_err());
    }

    #[test]
    fn cannot_end_before_start() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut session = LearningSession::start("u", start);
        assert!(session.end(start - chrono::TimeDelta::minutes(1), 0).is_err());
        assert!(session.is_open());
    }
}
