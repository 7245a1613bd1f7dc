use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .context("Failed to enable WAL mode")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    // Segment inserts must fail once their meeting is gone
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("Failed to enable foreign key enforcement")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS meetings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            started_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            ended_at DATETIME,
            summary TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create meetings table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transcript_segments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id INTEGER NOT NULL,
            speaker TEXT NOT NULL DEFAULT 'Unknown',
            text TEXT NOT NULL,
            timestamp_ms INTEGER NOT NULL,
            is_user BOOLEAN DEFAULT 0,
            confidence REAL DEFAULT 1.0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (meeting_id) REFERENCES meetings(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("Failed to create transcript_segments table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )",
        [],
    )
    .context("Failed to create settings table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_segments_meeting ON transcript_segments(meeting_id)",
        [],
    )
    .context("Failed to create segment meeting index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_segments_timestamp ON transcript_segments(timestamp_ms)",
        [],
    )
    .context("Failed to create segment timestamp index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meetings_started ON meetings(started_at)",
        [],
    )
    .context("Failed to create meetings started_at index")?;

    Ok(())
}
