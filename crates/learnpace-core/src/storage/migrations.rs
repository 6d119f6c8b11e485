//! Database schema migrations for learnpace.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Schema version after all migrations have run.
pub const CURRENT_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version; assuming empty database");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: playlists, videos, streaks and daily goals.
///
/// Video durations are whole microseconds. `video_count` is deliberately
/// absent; it is always derived from the videos table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS playlists (
            id                      TEXT PRIMARY KEY,
            user_id                 TEXT NOT NULL,
            title                   TEXT NOT NULL,
            description             TEXT NOT NULL DEFAULT '',
            start_date              TEXT NOT NULL,
            target_completion_days  INTEGER NOT NULL CHECK (target_completion_days >= 1),
            created_at              TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS videos (
            playlist_id   TEXT NOT NULL,
            video_id      TEXT NOT NULL,
            title         TEXT NOT NULL DEFAULT '',
            position      INTEGER NOT NULL,
            duration_us   INTEGER NOT NULL CHECK (duration_us >= 0),
            completed_at  TEXT,
            PRIMARY KEY (playlist_id, video_id),
            UNIQUE (playlist_id, position)
        );

        CREATE TABLE IF NOT EXISTS streaks (
            user_id             TEXT PRIMARY KEY,
            current_streak      INTEGER NOT NULL DEFAULT 0,
            longest_streak      INTEGER NOT NULL DEFAULT 0,
            last_activity_date  TEXT
        );

        CREATE TABLE IF NOT EXISTS daily_goals (
            user_id           TEXT NOT NULL,
            date              TEXT NOT NULL,
            videos_planned    INTEGER NOT NULL DEFAULT 0,
            videos_completed  INTEGER NOT NULL DEFAULT 0,
            is_completed      INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, date)
        );

        CREATE INDEX IF NOT EXISTS idx_playlists_user ON playlists(user_id);
        CREATE INDEX IF NOT EXISTS idx_videos_completed_at ON videos(completed_at);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: learning sessions.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS learning_sessions (
            id                 TEXT PRIMARY KEY,
            user_id            TEXT NOT NULL,
            date               TEXT NOT NULL,
            started_at         TEXT NOT NULL,
            ended_at           TEXT,
            videos_completed   INTEGER NOT NULL DEFAULT 0,
            total_duration_us  INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user_date ON learning_sessions(user_id, date);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i32>(0),
        )
        .unwrap()
            > 0
    }

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), CURRENT_VERSION);
        for table in ["playlists", "videos", "streaks", "daily_goals", "learning_sessions"] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), CURRENT_VERSION);
    }

    #[test]
    fn test_incremental_migration() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 1);
        assert!(!table_exists(&conn, "learning_sessions"));

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 2);
        assert!(table_exists(&conn, "learning_sessions"));
    }

    #[test]
    fn test_rejects_zero_target_days() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO playlists
                (id, user_id, title, start_date, target_completion_days, created_at)
             VALUES ('p', 'u', 't', '2024-01-01', 0, '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
