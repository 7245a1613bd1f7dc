//! Transcript segment persistence.
//!
//! Segments are immutable once written. Insert order follows the arrival
//! order of final recognition events; reads sort by `timestamp_ms`, which
//! matches insert order only when the upstream stream did not reorder
//! overlapping utterances.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::gateway::{NewSegment, StoredSegment};

pub struct SegmentRepository;

impl SegmentRepository {
    /// Insert a final transcript segment. Returns the new segment ID.
    /// Fails if the referenced meeting no longer exists.
    pub fn insert(conn: &Connection, segment: &NewSegment) -> Result<i64> {
        conn.execute(
            "INSERT INTO transcript_segments \
             (meeting_id, speaker, text, timestamp_ms, is_user, confidence) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                segment.meeting_id,
                segment.speaker,
                segment.text,
                segment.timestamp_ms,
                segment.is_user,
                segment.confidence,
            ],
        )
        .context("Failed to insert transcript segment")?;

        Ok(conn.last_insert_rowid())
    }

    /// Full transcript for a meeting, ordered by elapsed time.
    pub fn transcript(conn: &Connection, meeting_id: i64) -> Result<Vec<StoredSegment>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, meeting_id, speaker, text, timestamp_ms, is_user, confidence, created_at \
                 FROM transcript_segments \
                 WHERE meeting_id = ?1 \
                 ORDER BY timestamp_ms ASC, id ASC",
            )
            .context("Failed to prepare transcript query")?;

        let rows = stmt
            .query_map(params![meeting_id], |row| {
                Ok(StoredSegment {
                    id: row.get(0)?,
                    meeting_id: row.get(1)?,
                    speaker: row.get(2)?,
                    text: row.get(3)?,
                    timestamp_ms: row.get(4)?,
                    is_user: row.get(5)?,
                    confidence: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })
            .context("Failed to query transcript")?;

        let mut segments = Vec::new();
        for row in rows {
            segments.push(row?);
        }

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::meetings::MeetingRepository;
    use crate::db::migrate;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn segment(meeting_id: i64, text: &str, timestamp_ms: i64) -> NewSegment {
        NewSegment {
            meeting_id,
            speaker: "You".to_string(),
            text: text.to_string(),
            timestamp_ms,
            is_user: true,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_insert_segment() {
        let conn = setup_db();
        let meeting_id = MeetingRepository::create(&conn, "Standup").unwrap();

        let id = SegmentRepository::insert(&conn, &segment(meeting_id, "hello", 5000)).unwrap();
        assert!(id > 0);
    }

    #[test]
    fn test_insert_requires_existing_meeting() {
        let conn = setup_db();
        let result = SegmentRepository::insert(&conn, &segment(999, "orphan", 0));
        assert!(result.is_err());
    }

    #[test]
    fn test_transcript_ordered_by_timestamp() {
        let conn = setup_db();
        let meeting_id = MeetingRepository::create(&conn, "Standup").unwrap();

        SegmentRepository::insert(&conn, &segment(meeting_id, "second", 2000)).unwrap();
        SegmentRepository::insert(&conn, &segment(meeting_id, "first", 1000)).unwrap();

        let transcript = SegmentRepository::transcript(&conn, meeting_id).unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].text, "first");
        assert_eq!(transcript[1].text, "second");
    }

    #[test]
    fn test_transcript_scoped_to_meeting() {
        let conn = setup_db();
        let a = MeetingRepository::create(&conn, "A").unwrap();
        let b = MeetingRepository::create(&conn, "B").unwrap();

        SegmentRepository::insert(&conn, &segment(a, "from a", 100)).unwrap();
        SegmentRepository::insert(&conn, &segment(b, "from b", 200)).unwrap();

        let transcript = SegmentRepository::transcript(&conn, a).unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].text, "from a");
    }

    #[test]
    fn test_transcript_empty_for_new_meeting() {
        let conn = setup_db();
        let meeting_id = MeetingRepository::create(&conn, "Quiet").unwrap();
        assert!(SegmentRepository::transcript(&conn, meeting_id)
            .unwrap()
            .is_empty());
    }
}
