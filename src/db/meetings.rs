//! Meeting record persistence.
//!
//! CRUD operations for the `meetings` table. Raw SQL with rusqlite, no ORM.
//! A meeting is active while `ended_at` is NULL; `duration_minutes` is
//! derived from the two timestamps and undefined while active.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

/// A meeting record from the database.
#[derive(Debug, Clone)]
pub struct MeetingRecord {
    pub id: i64,
    pub title: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub summary: Option<String>,
    pub duration_minutes: Option<i64>,
}

const MEETING_COLUMNS: &str = "id, title, started_at, ended_at, summary, \
     CASE \
       WHEN ended_at IS NOT NULL \
       THEN CAST((julianday(ended_at) - julianday(started_at)) * 24 * 60 AS INTEGER) \
       ELSE NULL \
     END AS duration_minutes";

fn read_meeting(row: &Row<'_>) -> rusqlite::Result<MeetingRecord> {
    Ok(MeetingRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        started_at: row.get(2)?,
        ended_at: row.get(3)?,
        summary: row.get(4)?,
        duration_minutes: row.get(5)?,
    })
}

/// Repository for meeting records.
pub struct MeetingRepository;

impl MeetingRepository {
    /// Insert a new meeting. Returns the new meeting ID.
    pub fn create(conn: &Connection, title: &str) -> Result<i64> {
        conn.execute("INSERT INTO meetings (title) VALUES (?1)", params![title])
            .context("Failed to insert meeting")?;

        Ok(conn.last_insert_rowid())
    }

    /// Stamp the meeting's end time.
    pub fn end(conn: &Connection, id: i64) -> Result<()> {
        conn.execute(
            "UPDATE meetings SET ended_at = CURRENT_TIMESTAMP WHERE id = ?1",
            params![id],
        )
        .context("Failed to end meeting")?;
        Ok(())
    }

    pub fn set_summary(conn: &Connection, id: i64, summary: &str) -> Result<()> {
        conn.execute(
            "UPDATE meetings SET summary = ?1 WHERE id = ?2",
            params![summary, id],
        )
        .context("Failed to update meeting summary")?;
        Ok(())
    }

    /// Get a meeting by ID.
    pub fn get(conn: &Connection, id: i64) -> Result<Option<MeetingRecord>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1"
            ))
            .context("Failed to prepare meeting query")?;

        let mut rows = stmt
            .query_map(params![id], read_meeting)
            .context("Failed to query meeting")?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// List meetings, newest first.
    pub fn list(conn: &Connection, limit: usize, offset: usize) -> Result<Vec<MeetingRecord>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MEETING_COLUMNS} FROM meetings \
                 ORDER BY started_at DESC, id DESC LIMIT ?1 OFFSET ?2"
            ))
            .context("Failed to prepare meetings list query")?;

        let rows = stmt
            .query_map(params![limit as i64, offset as i64], read_meeting)
            .context("Failed to list meetings")?;

        let mut meetings = Vec::new();
        for row in rows {
            meetings.push(row?);
        }

        Ok(meetings)
    }

    /// Delete a meeting. Transcript segments cascade.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn
            .execute("DELETE FROM meetings WHERE id = ?1", params![id])
            .context("Failed to delete meeting")?;
        Ok(deleted > 0)
    }

    /// Search meetings by title, summary, or transcript text.
    pub fn search(conn: &Connection, query: &str) -> Result<Vec<MeetingRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT m.id, m.title, m.started_at, m.ended_at, m.summary, \
                 CASE \
                   WHEN m.ended_at IS NOT NULL \
                   THEN CAST((julianday(m.ended_at) - julianday(m.started_at)) * 24 * 60 AS INTEGER) \
                   ELSE NULL \
                 END AS duration_minutes \
                 FROM meetings m \
                 LEFT JOIN transcript_segments ts ON m.id = ts.meeting_id \
                 WHERE m.title LIKE ?1 OR m.summary LIKE ?1 OR ts.text LIKE ?1 \
                 ORDER BY m.started_at DESC \
                 LIMIT 50",
            )
            .context("Failed to prepare meeting search query")?;

        let term = format!("%{}%", query);
        let rows = stmt
            .query_map(params![term], read_meeting)
            .context("Failed to search meetings")?;

        let mut meetings = Vec::new();
        for row in rows {
            meetings.push(row?);
        }

        Ok(meetings)
    }
}
