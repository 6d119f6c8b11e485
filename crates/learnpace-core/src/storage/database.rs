//! SQLite-backed store for playlists, streaks, goals and sessions.
//!
//! Provides persistent storage for:
//! - Imported playlists and per-video completion timestamps
//! - Per-user streak counters
//! - Daily goals keyed by user and date
//! - Learning sessions
//!
//! Schedules and progress are never stored; they are recomputed from the
//! rows here on every request.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::duration::WatchTime;
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::goals::DailyGoal;
use crate::playlist::{Playlist, Video};
use crate::session::LearningSession;
use crate::store::{
    CommittedCompletion, CompletionStore, GoalStore, PlaylistStore, StreakStore,
};
use crate::streak::StreakState;

use super::{data_dir, migrations};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite database implementing every store trait.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/learnpace.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("learnpace.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Begin a write transaction that takes the database lock up front, so
    /// two read-modify-write cycles can never interleave.
    fn immediate(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    fn load_videos(&self, playlist_id: &str) -> Result<Vec<Video>> {
        let mut stmt = self.conn.prepare(
            "SELECT video_id, title, position, duration_us, completed_at
             FROM videos
             WHERE playlist_id = ?1
             ORDER BY position",
        )?;
        let rows = stmt.query_map(params![playlist_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut videos = Vec::new();
        for row in rows {
            let (id, title, position, duration_us, completed_at) = row?;
            let duration_us = u64::try_from(duration_us)
                .map_err(|_| corrupt("videos", format!("negative duration for '{id}'")))?;
            let mut video = Video::new(id, title, position, WatchTime::from_micros(duration_us));
            if let Some(raw) = completed_at {
                video.completed_at = Some(parse_timestamp("videos", &raw)?);
            }
            videos.push(video);
        }
        Ok(videos)
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Insert or update a learning session.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn save_session(&self, session: &LearningSession) -> Result<()> {
        self.conn.execute(
            "INSERT INTO learning_sessions
                (id, user_id, date, started_at, ended_at, videos_completed, total_duration_us)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                ended_at = excluded.ended_at,
                videos_completed = excluded.videos_completed,
                total_duration_us = excluded.total_duration_us",
            params![
                session.id,
                session.user_id,
                format_date(session.date),
                format_timestamp(session.started_at),
                session.ended_at.map(format_timestamp),
                session.videos_completed,
                session.total_duration.map(|d| d.as_micros() as i64),
            ],
        )?;
        Ok(())
    }

    /// # Errors
    /// Returns [`CoreError::NotFound`] for an unknown id.
    pub fn load_session(&self, session_id: &str) -> Result<LearningSession> {
        let mut sessions = self.query_sessions(
            "SELECT id, user_id, date, started_at, ended_at, videos_completed, total_duration_us
             FROM learning_sessions WHERE id = ?1",
            params![session_id],
        )?;
        sessions
            .pop()
            .ok_or_else(|| CoreError::not_found("session", session_id))
    }

    /// Most recent sessions first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list_sessions(&self, user_id: &str, limit: u32) -> Result<Vec<LearningSession>> {
        self.query_sessions(
            "SELECT id, user_id, date, started_at, ended_at, videos_completed, total_duration_us
             FROM learning_sessions WHERE user_id = ?1
             ORDER BY started_at DESC LIMIT ?2",
            params![user_id, limit],
        )
    }

    fn query_sessions(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<LearningSession>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, Option<i64>>(6)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, user_id, date, started_at, ended_at, videos_completed, total_us) = row?;
            sessions.push(LearningSession {
                id,
                user_id,
                date: parse_date("learning_sessions", &date)?,
                started_at: parse_timestamp("learning_sessions", &started_at)?,
                ended_at: ended_at
                    .map(|raw| parse_timestamp("learning_sessions", &raw))
                    .transpose()?,
                videos_completed,
                total_duration: total_us.map(|us| WatchTime::from_micros(us.max(0) as u64)),
            });
        }
        Ok(sessions)
    }
}

impl PlaylistStore for Database {
    fn insert_playlist(&self, playlist: &Playlist) -> Result<()> {
        let tx = self.immediate()?;
        let inserted = tx.execute(
            "INSERT INTO playlists
                (id, user_id, title, description, start_date, target_completion_days, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO NOTHING",
            params![
                playlist.id,
                playlist.user_id,
                playlist.title,
                playlist.description,
                format_date(playlist.start_date),
                playlist.target_completion_days().get(),
                format_timestamp(Utc::now()),
            ],
        )?;
        if inserted == 0 {
            return Err(ValidationError::AlreadyExists {
                kind: "playlist",
                id: playlist.id.clone(),
            }
            .into());
        }
        write_videos(&tx, playlist)?;
        tx.commit()?;

        tracing::debug!(
            playlist_id = %playlist.id,
            videos = playlist.video_count(),
            "inserted playlist"
        );
        Ok(())
    }

    fn save_playlist(&self, playlist: &Playlist) -> Result<()> {
        let tx = self.immediate()?;
        let updated = tx.execute(
            "UPDATE playlists SET
                title = ?2,
                description = ?3,
                start_date = ?4,
                target_completion_days = ?5
             WHERE id = ?1",
            params![
                playlist.id,
                playlist.title,
                playlist.description,
                format_date(playlist.start_date),
                playlist.target_completion_days().get(),
            ],
        )?;
        if updated == 0 {
            return Err(CoreError::not_found("playlist", &playlist.id));
        }
        tx.execute("DELETE FROM videos WHERE playlist_id = ?1", params![playlist.id])?;
        write_videos(&tx, playlist)?;
        tx.commit()?;

        tracing::debug!(playlist_id = %playlist.id, "saved playlist");
        Ok(())
    }

    fn load_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, title, description, start_date, target_completion_days
                 FROM playlists WHERE id = ?1",
                params![playlist_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, u32>(5)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found("playlist", playlist_id))?;

        let (id, user_id, title, description, start_date, target_days) = row;
        let videos = self.load_videos(&id)?;
        let playlist = Playlist::new(
            id,
            user_id,
            title,
            parse_date("playlists", &start_date)?,
            target_days,
            videos,
        )
        .map_err(|e| corrupt("playlists", e.to_string()))?;
        Ok(playlist.with_description(description))
    }

    fn list_playlists(&self, user_id: &str) -> Result<Vec<Playlist>> {
        let ids = {
            let mut stmt = self
                .conn
                .prepare("SELECT id FROM playlists WHERE user_id = ?1 ORDER BY created_at, id")?;
            let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        ids.iter().map(|id| self.load_playlist(id)).collect()
    }

    fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        let tx = self.immediate()?;
        tx.execute("DELETE FROM videos WHERE playlist_id = ?1", params![playlist_id])?;
        let deleted = tx.execute("DELETE FROM playlists WHERE id = ?1", params![playlist_id])?;
        if deleted == 0 {
            return Err(CoreError::not_found("playlist", playlist_id));
        }
        tx.commit()?;
        Ok(())
    }

    fn completions_on(&self, user_id: &str, date: NaiveDate) -> Result<u32> {
        count_completions_on(&self.conn, user_id, date)
    }

    fn completions_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.completed_at
             FROM videos v JOIN playlists p ON p.id = v.playlist_id
             WHERE p.user_id = ?1 AND v.completed_at IS NOT NULL AND v.completed_at >= ?2
             ORDER BY v.completed_at",
        )?;
        let rows = stmt.query_map(params![user_id, format_timestamp(since)], |row| {
            row.get::<_, String>(0)
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(parse_timestamp("videos", &row?)?);
        }
        Ok(out)
    }

    fn completed_totals(&self, user_id: &str) -> Result<(u32, WatchTime)> {
        let (count, micros) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(v.duration_us), 0)
             FROM videos v JOIN playlists p ON p.id = v.playlist_id
             WHERE p.user_id = ?1 AND v.completed_at IS NOT NULL",
            params![user_id],
            |row| Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok((count, WatchTime::from_micros(micros.max(0) as u64)))
    }
}

fn write_videos(conn: &Connection, playlist: &Playlist) -> Result<()> {
    let mut insert = conn.prepare(
        "INSERT INTO videos
            (playlist_id, video_id, title, position, duration_us, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for video in playlist.videos() {
        insert.execute(params![
            playlist.id,
            video.id,
            video.title,
            video.position,
            video.duration.as_micros() as i64,
            video.completed_at.map(format_timestamp),
        ])?;
    }
    Ok(())
}

/// Set the completion timestamp if unset. `false` means it already was.
fn mark_completed(
    conn: &Connection,
    playlist_id: &str,
    video_id: &str,
    at: DateTime<Utc>,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE videos SET completed_at = ?3
         WHERE playlist_id = ?1 AND video_id = ?2 AND completed_at IS NULL",
        params![playlist_id, video_id, format_timestamp(at)],
    )?;
    if updated > 0 {
        return Ok(true);
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM videos WHERE playlist_id = ?1 AND video_id = ?2)",
        params![playlist_id, video_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(CoreError::not_found("video", video_id));
    }
    Ok(false)
}

fn count_completions_on(conn: &Connection, user_id: &str, date: NaiveDate) -> Result<u32> {
    let count = conn.query_row(
        "SELECT COUNT(*)
         FROM videos v JOIN playlists p ON p.id = v.playlist_id
         WHERE p.user_id = ?1 AND substr(v.completed_at, 1, 10) = ?2",
        params![user_id, format_date(date)],
        |row| row.get::<_, u32>(0),
    )?;
    Ok(count)
}

fn read_streak(conn: &Connection, user_id: &str) -> Result<StreakState> {
    let row = conn
        .query_row(
            "SELECT current_streak, longest_streak, last_activity_date
             FROM streaks WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        None => Ok(StreakState::new()),
        Some((current, longest, last)) => {
            let last = last.map(|raw| parse_date("streaks", &raw)).transpose()?;
            StreakState::restore(current, longest, last)
                .map_err(|e| corrupt("streaks", e.to_string()))
        }
    }
}

fn write_streak(conn: &Connection, user_id: &str, state: &StreakState) -> Result<()> {
    conn.execute(
        "INSERT INTO streaks (user_id, current_streak, longest_streak, last_activity_date)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO UPDATE SET
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            last_activity_date = excluded.last_activity_date",
        params![
            user_id,
            state.current_streak(),
            state.longest_streak(),
            state.last_activity_date().map(format_date),
        ],
    )?;
    Ok(())
}

impl StreakStore for Database {
    fn load_streak(&self, user_id: &str) -> Result<StreakState> {
        read_streak(&self.conn, user_id)
    }

    fn modify_streak(
        &self,
        user_id: &str,
        f: &mut dyn FnMut(&mut StreakState),
    ) -> Result<StreakState> {
        let tx = self.immediate()?;
        let mut state = read_streak(&tx, user_id)?;
        f(&mut state);
        write_streak(&tx, user_id, &state)?;
        tx.commit()?;
        Ok(state)
    }
}

fn read_goal(conn: &Connection, user_id: &str, date: NaiveDate) -> Result<Option<DailyGoal>> {
    let row = conn
        .query_row(
            "SELECT videos_planned, videos_completed
             FROM daily_goals WHERE user_id = ?1 AND date = ?2",
            params![user_id, format_date(date)],
            |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
        )
        .optional()?;
    Ok(row.map(|(planned, completed)| DailyGoal::restore(user_id, date, planned, completed)))
}

fn write_goal(conn: &Connection, goal: &DailyGoal) -> Result<()> {
    conn.execute(
        "INSERT INTO daily_goals
            (user_id, date, videos_planned, videos_completed, is_completed)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, date) DO UPDATE SET
            videos_planned = excluded.videos_planned,
            videos_completed = excluded.videos_completed,
            is_completed = excluded.is_completed",
        params![
            goal.user_id(),
            format_date(goal.date()),
            goal.videos_planned(),
            goal.videos_completed(),
            goal.is_completed(),
        ],
    )?;
    Ok(())
}

impl GoalStore for Database {
    fn find_goal(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyGoal>> {
        read_goal(&self.conn, user_id, date)
    }

    fn goals_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<DailyGoal>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, videos_planned, videos_completed
             FROM daily_goals WHERE user_id = ?1 AND date >= ?2
             ORDER BY date DESC",
        )?;
        let rows = stmt.query_map(params![user_id, format_date(since)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })?;

        let mut goals = Vec::new();
        for row in rows {
            let (date, planned, completed) = row?;
            goals.push(DailyGoal::restore(
                user_id,
                parse_date("daily_goals", &date)?,
                planned,
                completed,
            ));
        }
        Ok(goals)
    }

    fn modify_goal(
        &self,
        user_id: &str,
        date: NaiveDate,
        f: &mut dyn FnMut(&mut DailyGoal),
    ) -> Result<DailyGoal> {
        let tx = self.immediate()?;
        let mut goal = read_goal(&tx, user_id, date)?
            .unwrap_or_else(|| DailyGoal::new(user_id, date));
        f(&mut goal);
        write_goal(&tx, &goal)?;
        tx.commit()?;
        Ok(goal.stored())
    }
}

impl CompletionStore for Database {
    fn commit_completion(
        &self,
        user_id: &str,
        playlist_id: &str,
        video_id: &str,
        at: DateTime<Utc>,
        update_streak: &mut dyn FnMut(&mut StreakState),
        update_goal: &mut dyn FnMut(&mut DailyGoal, u32),
    ) -> Result<Option<CommittedCompletion>> {
        let tx = self.immediate()?;
        if !mark_completed(&tx, playlist_id, video_id, at)? {
            return Ok(None);
        }

        let mut streak = read_streak(&tx, user_id)?;
        update_streak(&mut streak);
        write_streak(&tx, user_id, &streak)?;

        let date = at.date_naive();
        let completed_on_date = count_completions_on(&tx, user_id, date)?;
        let mut goal = read_goal(&tx, user_id, date)?
            .unwrap_or_else(|| DailyGoal::new(user_id, date));
        update_goal(&mut goal, completed_on_date);
        write_goal(&tx, &goal)?;
        tx.commit()?;

        tracing::debug!(playlist_id, video_id, completed_on_date, "committed completion");
        Ok(Some(CommittedCompletion {
            streak,
            goal: goal.stored(),
            completed_on_date,
        }))
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Fixed-width UTC form so timestamps compare correctly as text.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_date(table: &'static str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| corrupt(table, format!("bad date '{raw}': {e}")))
}

fn parse_timestamp(table: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("bad timestamp '{raw}': {e}")))
}

fn corrupt(table: &'static str, message: impl Into<String>) -> CoreError {
    DatabaseError::CorruptRow {
        table,
        message: message.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample(id: &str, user: &str) -> Playlist {
        Playlist::new(
            id,
            user,
            "Course",
            date(2024, 1, 1),
            2,
            vec![
                Video::new("a", "A", 0, WatchTime::from_minutes(10)),
                Video::new("b", "B", 1, WatchTime::from_minutes(10)),
                Video::new("c", "C", 2, WatchTime::from_secs(601)),
            ],
        )
        .unwrap()
        .with_description("desc")
    }

    #[test]
    fn playlist_round_trip() {
        let db = Database::open_memory().unwrap();
        let playlist = sample("p1", "u");
        db.insert_playlist(&playlist).unwrap();

        let loaded = db.load_playlist("p1").unwrap();
        assert_eq!(loaded.videos(), playlist.videos());
        assert_eq!(loaded.description, "desc");
        assert_eq!(loaded.target_completion_days().get(), 2);
        assert_eq!(loaded.video_count(), 3);
    }

    #[test]
    fn missing_playlist_is_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.load_playlist("nope"),
            Err(CoreError::NotFound { kind: "playlist", .. })
        ));
        assert!(matches!(
            db.delete_playlist("nope"),
            Err(CoreError::NotFound { .. })
        ));
    }

    fn complete(db: &Database, user: &str, playlist: &str, video: &str, at: DateTime<Utc>) -> bool {
        db.commit_completion(user, playlist, video, at, &mut |_| {}, &mut |_, _| {})
            .unwrap()
            .is_some()
    }

    #[test]
    fn completions_are_counted_per_user_and_day() {
        let db = Database::open_memory().unwrap();
        db.insert_playlist(&sample("p1", "u")).unwrap();
        db.insert_playlist(&sample("p2", "other")).unwrap();

        let morning = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        complete(&db, "u", "p1", "a", morning);
        complete(&db, "u", "p1", "b", morning + chrono::TimeDelta::hours(3));
        complete(&db, "other", "p2", "a", morning);

        assert_eq!(db.completions_on("u", date(2024, 1, 2)).unwrap(), 2);
        assert_eq!(db.completions_on("u", date(2024, 1, 3)).unwrap(), 0);
        assert_eq!(db.completions_since("u", morning).unwrap().len(), 2);
        assert_eq!(
            db.completed_totals("u").unwrap(),
            (2, WatchTime::from_minutes(20))
        );
    }

    #[test]
    fn commit_writes_timestamp_streak_and_goal_together() {
        let db = Database::open_memory().unwrap();
        db.insert_playlist(&sample("p1", "u")).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();

        let committed = db
            .commit_completion(
                "u",
                "p1",
                "a",
                at,
                &mut |s| {
                    s.record_activity(at.date_naive());
                },
                &mut |g, completed| {
                    g.update_progress(completed);
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(committed.completed_on_date, 1);
        assert_eq!(committed.streak.current_streak(), 1);
        assert_eq!(db.load_streak("u").unwrap(), committed.streak);
        assert_eq!(db.find_goal("u", date(2024, 1, 2)).unwrap(), Some(committed.goal));
    }

    #[test]
    fn committing_twice_keeps_first_timestamp() {
        let db = Database::open_memory().unwrap();
        db.insert_playlist(&sample("p1", "u")).unwrap();
        let first = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        assert!(complete(&db, "u", "p1", "a", first));

        let mut touched = false;
        let again = db
            .commit_completion(
                "u",
                "p1",
                "a",
                first + chrono::TimeDelta::days(1),
                &mut |_| touched = true,
                &mut |_, _| {},
            )
            .unwrap();
        assert!(again.is_none());
        assert!(!touched);
        assert!(db.find_goal("u", date(2024, 1, 3)).unwrap().is_none());
        assert_eq!(
            db.load_playlist("p1").unwrap().video("a").unwrap().completed_at,
            Some(first)
        );
        assert!(matches!(
            db.commit_completion("u", "p1", "zzz", first, &mut |_| {}, &mut |_, _| {}),
            Err(CoreError::NotFound { kind: "video", .. })
        ));
    }

    #[test]
    fn reinserting_a_playlist_keeps_owner_and_history() {
        let db = Database::open_memory().unwrap();
        db.insert_playlist(&sample("shared", "alice")).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        complete(&db, "alice", "shared", "a", at);

        let err = db.insert_playlist(&sample("shared", "bob")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::AlreadyExists { kind: "playlist", .. })
        ));

        let stored = db.load_playlist("shared").unwrap();
        assert_eq!(stored.user_id, "alice");
        assert_eq!(stored.video("a").unwrap().completed_at, Some(at));
        assert!(db.list_playlists("bob").unwrap().is_empty());
        assert_eq!(db.completions_on("alice", date(2024, 1, 2)).unwrap(), 1);
    }

    #[test]
    fn streak_persists_through_modify() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.load_streak("u").unwrap(), StreakState::new());
        db.modify_streak("u", &mut |s| {
            s.record_activity(date(2024, 1, 1));
        })
        .unwrap();
        let state = db
            .modify_streak("u", &mut |s| {
                s.record_activity(date(2024, 1, 2));
            })
            .unwrap();
        assert_eq!(state.current_streak(), 2);
        assert_eq!(db.load_streak("u").unwrap(), state);
    }

    #[test]
    fn goals_upsert_by_user_and_date() {
        let db = Database::open_memory().unwrap();
        let today = date(2024, 1, 2);
        assert!(db.find_goal("u", today).unwrap().is_none());

        db.modify_goal("u", today, &mut |g| {
            g.set_planned(3);
        })
        .unwrap();
        db.modify_goal("u", today, &mut |g| {
            g.update_progress(3);
        })
        .unwrap();

        let goal = db.find_goal("u", today).unwrap().unwrap();
        assert_eq!(goal.videos_planned(), 3);
        assert!(goal.is_completed());
        assert_eq!(db.goals_since("u", date(2024, 1, 1)).unwrap().len(), 1);
        assert!(db.goals_since("u", date(2024, 1, 3)).unwrap().is_empty());
    }

    #[test]
    fn sessions_round_trip() {
        let db = Database::open_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        let mut session = LearningSession::start("u", start);
        db.save_session(&session).unwrap();

        session.end(start + chrono::TimeDelta::minutes(30), 2).unwrap();
        db.save_session(&session).unwrap();

        let loaded = db.load_session(&session.id).unwrap();
        assert_eq!(loaded, session);
        assert_eq!(db.list_sessions("u", 10).unwrap().len(), 1);
        assert!(db.load_session("missing").is_err());
    }

    #[test]
    fn saving_an_unknown_playlist_is_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.save_playlist(&sample("p1", "u")),
            Err(CoreError::NotFound { kind: "playlist", .. })
        ));
        assert!(db.list_playlists("u").unwrap().is_empty());
    }

    #[test]
    fn resaving_playlist_replaces_videos() {
        let db = Database::open_memory().unwrap();
        db.insert_playlist(&sample("p1", "u")).unwrap();
        let mut edited = db.load_playlist("p1").unwrap();
        edited.set_target_completion_days(7).unwrap();
        db.save_playlist(&edited).unwrap();
        let loaded = db.load_playlist("p1").unwrap();
        assert_eq!(loaded.target_completion_days().get(), 7);
        assert_eq!(loaded.video_count(), 3);
        assert_eq!(db.list_playlists("u").unwrap().len(), 1);
    }
}
