//! Playlist import from a JSON export.
//!
//! ```json
//! {
//!   "id": "PL123",
//!   "title": "Rust in a weekend",
//!   "description": "optional",
//!   "videos": [
//!     { "id": "abc", "title": "Intro", "duration": "PT12M30S" }
//!   ]
//! }
//! ```
//!
//! Video positions follow file order. Entries that fail to parse are
//! skipped with a warning; an export with no usable videos is rejected.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::duration::WatchTime;
use crate::error::{CoreError, Result, ValidationError};
use crate::playlist::{Playlist, Video};

#[derive(Debug, Clone, Deserialize)]
struct RawPlaylist {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    videos: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawVideo {
    id: String,
    #[serde(default)]
    title: String,
    duration: String,
}

/// A parsed export, ready to become a [`Playlist`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistImport {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub videos: Vec<Video>,
    /// Entries dropped because they did not parse
    pub skipped: usize,
}

impl PlaylistImport {
    /// Parse an export document.
    ///
    /// # Errors
    /// Returns [`CoreError::Json`] for malformed JSON and a validation error
    /// when no video entry is usable.
    pub fn from_json(input: &str) -> Result<Self> {
        let raw: RawPlaylist = serde_json::from_str(input)?;

        let mut videos = Vec::with_capacity(raw.videos.len());
        let mut skipped = 0;
        for (index, entry) in raw.videos.into_iter().enumerate() {
            match parse_video(entry) {
                Ok((id, title, duration)) => {
                    let position = videos.len() as i64;
                    videos.push(Video::new(id, title, position, duration));
                }
                Err(reason) => {
                    tracing::warn!(index, %reason, "skipping unparseable video entry");
                    skipped += 1;
                }
            }
        }

        if videos.is_empty() {
            return Err(ValidationError::EmptyCollection(format!(
                "playlist '{}' has no usable videos",
                raw.title
            ))
            .into());
        }

        Ok(Self {
            id: raw.id.filter(|id| !id.trim().is_empty()),
            title: raw.title,
            description: raw.description,
            videos,
            skipped,
        })
    }

    /// Sum of video durations.
    pub fn total_duration(&self) -> WatchTime {
        self.videos.iter().map(|v| v.duration).sum()
    }

    /// Total extrapolated over every entry in the file, skipped ones
    /// included, from the average of the usable videos.
    pub fn estimated_total_duration(&self) -> Option<WatchTime> {
        let sample: Vec<WatchTime> = self.videos.iter().map(|v| v.duration).collect();
        let entries = u32::try_from(self.videos.len() + self.skipped).unwrap_or(u32::MAX);
        WatchTime::estimate_total(&sample, entries)
    }

    /// Build the playlist for `user_id`; a missing id gets a fresh UUID.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for a zero target or duplicate video ids.
    pub fn into_playlist(
        self,
        user_id: &str,
        start_date: NaiveDate,
        target_completion_days: u32,
    ) -> Result<Playlist, CoreError> {
        let id = self
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let playlist = Playlist::new(
            id,
            user_id,
            self.title,
            start_date,
            target_completion_days,
            self.videos,
        )?;
        Ok(playlist.with_description(self.description))
    }
}

fn parse_video(
    entry: serde_json::Value,
) -> std::result::Result<(String, String, WatchTime), String> {
    let raw: RawVideo = serde_json::from_value(entry).map_err(|e| e.to_string())?;
    if raw.id.trim().is_empty() {
        return Err("empty video id".into());
    }
    let duration = WatchTime::parse_iso8601(&raw.duration).map_err(|e| e.to_string())?;
    Ok((raw.id, raw.title, duration))
}
