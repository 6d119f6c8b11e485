//! Playlists and their videos.
//!
//! A [`Playlist`] owns its videos in position order. Construction validates
//! the ordering invariants once so the scheduling code can rely on them:
//! positions are unique, video ids are unique, and the target window is at
//! least one day. The video count is always `videos.len()`.

use std::collections::HashSet;
use std::num::NonZeroU32;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::WatchTime;
use crate::error::{CoreError, ValidationError};
use crate::events::Event;

/// A single video inside a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Platform video id, unique within its playlist
    pub id: String,
    pub title: String,
    /// Watch order within the playlist
    pub position: i64,
    pub duration: WatchTime,
    /// Set exactly when the video has been watched
    pub completed_at: Option<DateTime<Utc>>,
}

impl Video {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        position: i64,
        duration: WatchTime,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            position,
            duration,
            completed_at: None,
        }
    }

    /// Builder-style helper used when loading already-watched videos.
    pub fn completed_on(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// An imported playlist with its schedule parameters.
#[derive(Debug, Clone, Serialize)]
pub struct Playlist {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    /// Day 0 of the schedule
    pub start_date: NaiveDate,
    target_completion_days: NonZeroU32,
    videos: Vec<Video>,
}

impl Playlist {
    /// Build a playlist, ordering `videos` by position.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if `target_completion_days` is zero or if
    /// two videos share a position or an id.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
        start_date: NaiveDate,
        target_completion_days: u32,
        mut videos: Vec<Video>,
    ) -> Result<Self, ValidationError> {
        let target_completion_days = validate_target_days(target_completion_days)?;

        videos.sort_by_key(|v| v.position);
        for pair in videos.windows(2) {
            if pair[0].position == pair[1].position {
                return Err(ValidationError::DuplicatePosition {
                    position: pair[0].position,
                });
            }
        }
        let mut seen = HashSet::with_capacity(videos.len());
        for video in &videos {
            if !seen.insert(video.id.as_str()) {
                return Err(ValidationError::DuplicateVideo {
                    id: video.id.clone(),
                });
            }
        }

        Ok(Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            description: String::new(),
            start_date,
            target_completion_days,
            videos,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn target_completion_days(&self) -> NonZeroU32 {
        self.target_completion_days
    }

    /// # Errors
    /// Returns a [`ValidationError`] if `days` is zero.
    pub fn set_target_completion_days(&mut self, days: u32) -> Result<(), ValidationError> {
        self.target_completion_days = validate_target_days(days)?;
        Ok(())
    }

    /// Videos in position order.
    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn video(&self, video_id: &str) -> Option<&Video> {
        self.videos.iter().find(|v| v.id == video_id)
    }

    pub fn video_count(&self) -> usize {
        self.videos.len()
    }

    pub fn completed_count(&self) -> usize {
        self.videos.iter().filter(|v| v.is_completed()).count()
    }

    pub fn remaining_count(&self) -> usize {
        self.video_count() - self.completed_count()
    }

    pub fn total_duration(&self) -> WatchTime {
        self.videos.iter().map(|v| v.duration).sum()
    }

    pub fn completed_duration(&self) -> WatchTime {
        self.videos
            .iter()
            .filter(|v| v.is_completed())
            .map(|v| v.duration)
            .sum()
    }

    /// Mark a video watched at `at` and return the event to publish.
    ///
    /// Completing an already-completed video keeps the first timestamp and
    /// publishes nothing, so a repeated click cannot double count.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if the video is not in this playlist.
    pub fn complete_video(
        &mut self,
        video_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Event>, CoreError> {
        let video = self
            .videos
            .iter_mut()
            .find(|v| v.id == video_id)
            .ok_or_else(|| CoreError::not_found("video", video_id))?;

        if video.is_completed() {
            tracing::debug!(video_id, "video already completed; no event published");
            return Ok(None);
        }
        video.completed_at = Some(at);

        Ok(Some(Event::VideoCompleted {
            user_id: self.user_id.clone(),
            playlist_id: self.id.clone(),
            video_id: video_id.to_string(),
            at,
        }))
    }
}

fn validate_target_days(days: u32) -> Result<NonZeroU32, ValidationError> {
    NonZeroU32::new(days).ok_or_else(|| {
        ValidationError::invalid_value("target_completion_days", "must be at least 1")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn minutes(id: &str, position: i64, m: u64) -> Video {
        Video::new(id, id, position, WatchTime::from_minutes(m))
    }

    #[test]
    fn orders_videos_by_position() {
        let playlist = Playlist::new(
            "p",
            "u",
            "Rust",
            date(2024, 1, 1),
            3,
            vec![minutes("c", 30, 1), minutes("a", 10, 1), minutes("b", 20, 1)],
        )
        .unwrap();
        let ids: Vec<_> = playlist.videos().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(playlist.video_count(), 3);
    }

    #[test]
    fn rejects_zero_target_days() {
        let err = Playlist::new("p", "u", "t", date(2024, 1, 1), 0, vec![]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_duplicate_positions() {
        let err = Playlist::new(
            "p",
            "u",
            "t",
            date(2024, 1, 1),
            1,
            vec![minutes("a", 1, 1), minutes("b", 1, 1)],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::DuplicatePosition { position: 1 });
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Playlist::new(
            "p",
            "u",
            "t",
            date(2024, 1, 1),
            1,
            vec![minutes("a", 1, 1), minutes("a", 2, 1)],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateVideo { id: "a".into() });
    }

    #[test]
    fn completion_publishes_event_once() {
        let mut playlist = Playlist::new(
            "p",
            "u",
            "t",
            date(2024, 1, 1),
            1,
            vec![minutes("a", 0, 10), minutes("b", 1, 5)],
        )
        .unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();

        let event = playlist.complete_video("a", at).unwrap();
        assert!(matches!(
            event,
            Some(Event::VideoCompleted { ref video_id, .. }) if video_id == "a"
        ));
        assert_eq!(playlist.completed_count(), 1);
        assert_eq!(playlist.completed_duration(), WatchTime::from_minutes(10));
        assert_eq!(playlist.total_duration(), WatchTime::from_minutes(15));

        let later = at + chrono::TimeDelta::hours(1);
        assert!(playlist.complete_video("a", later).unwrap().is_none());
        assert_eq!(playlist.video("a").unwrap().completed_at, Some(at));
    }

    #[test]
    fn completing_unknown_video_is_not_found() {
        let mut playlist = Playlist::new("p", "u", "t", date(2024, 1, 1), 1, vec![]).unwrap();
        let err = playlist.complete_video("zzz", Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "video", .. }));
    }
}
