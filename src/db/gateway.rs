//! Durable store boundary for the recording pipeline.
//!
//! The session machine and stream processor only see this trait, so tests
//! can substitute an in-memory store. The SQLite implementation opens a
//! fresh connection per operation on the blocking pool, which keeps
//! rusqlite's non-Send connections off the async runtime.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task;

use super::init::init_db;
use super::meetings::MeetingRepository;
use super::segments::SegmentRepository;

/// A final transcript segment about to be persisted.
#[derive(Debug, Clone)]
pub struct NewSegment {
    pub meeting_id: i64,
    pub speaker: String,
    pub text: String,
    pub timestamp_ms: i64,
    pub is_user: bool,
    pub confidence: f64,
}

/// A persisted transcript segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSegment {
    pub id: i64,
    pub meeting_id: i64,
    pub speaker: String,
    pub text: String,
    pub timestamp_ms: i64,
    pub is_user: bool,
    pub confidence: f64,
    pub created_at: String,
}

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn create_meeting(&self, title: &str) -> Result<i64>;
    async fn end_meeting(&self, meeting_id: i64) -> Result<()>;
    async fn set_summary(&self, meeting_id: i64, summary: &str) -> Result<()>;
    async fn transcript(&self, meeting_id: i64) -> Result<Vec<StoredSegment>>;
    async fn insert_segment(&self, segment: NewSegment) -> Result<i64>;
}

/// SQLite-backed gateway over the repository layer.
pub struct SqliteGateway;

async fn blocking<T, F>(op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
{
    task::spawn_blocking(move || {
        let conn = init_db()?;
        op(&conn)
    })
    .await
    .map_err(|e| anyhow!("database task failed: {e}"))?
}

/// In-memory gateway for exercising the pipeline without SQLite.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct MemoryMeeting {
        pub id: i64,
        pub title: String,
        pub ended: bool,
        pub summary: Option<String>,
    }

    #[derive(Default)]
    pub struct MemoryGateway {
        next_id: AtomicI64,
        pub meetings: Mutex<Vec<MemoryMeeting>>,
        pub segments: Mutex<Vec<StoredSegment>>,
        pub fail_segment_inserts: AtomicBool,
    }

    impl MemoryGateway {
        pub fn new() -> Self {
            Self {
                next_id: AtomicI64::new(1),
                ..Self::default()
            }
        }

        pub fn segment_texts(&self) -> Vec<String> {
            self.segments
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl PersistenceGateway for MemoryGateway {
        async fn create_meeting(&self, title: &str) -> Result<i64> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.meetings.lock().unwrap().push(MemoryMeeting {
                id,
                title: title.to_string(),
                ended: false,
                summary: None,
            });
            Ok(id)
        }

        async fn end_meeting(&self, meeting_id: i64) -> Result<()> {
            let mut meetings = self.meetings.lock().unwrap();
            let meeting = meetings
                .iter_mut()
                .find(|m| m.id == meeting_id)
                .ok_or_else(|| anyhow!("no such meeting: {meeting_id}"))?;
            meeting.ended = true;
            Ok(())
        }

        async fn set_summary(&self, meeting_id: i64, summary: &str) -> Result<()> {
            let mut meetings = self.meetings.lock().unwrap();
            let meeting = meetings
                .iter_mut()
                .find(|m| m.id == meeting_id)
                .ok_or_else(|| anyhow!("no such meeting: {meeting_id}"))?;
            meeting.summary = Some(summary.to_string());
            Ok(())
        }

        async fn transcript(&self, meeting_id: i64) -> Result<Vec<StoredSegment>> {
            Ok(self
                .segments
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.meeting_id == meeting_id)
                .cloned()
                .collect())
        }

        async fn insert_segment(&self, segment: NewSegment) -> Result<i64> {
            if self.fail_segment_inserts.load(Ordering::SeqCst) {
                return Err(anyhow!("segment insert failure injected"));
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.segments.lock().unwrap().push(StoredSegment {
                id,
                meeting_id: segment.meeting_id,
                speaker: segment.speaker,
                text: segment.text,
                timestamp_ms: segment.timestamp_ms,
                is_user: segment.is_user,
                confidence: segment.confidence,
                created_at: String::new(),
            });
            Ok(id)
        }
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn create_meeting(&self, title: &str) -> Result<i64> {
        let title = title.to_string();
        blocking(move |conn| MeetingRepository::create(conn, &title)).await
    }

    async fn end_meeting(&self, meeting_id: i64) -> Result<()> {
        blocking(move |conn| MeetingRepository::end(conn, meeting_id)).await
    }

    async fn set_summary(&self, meeting_id: i64, summary: &str) -> Result<()> {
        let summary = summary.to_string();
        blocking(move |conn| MeetingRepository::set_summary(conn, meeting_id, &summary)).await
    }

    async fn transcript(&self, meeting_id: i64) -> Result<Vec<StoredSegment>> {
        blocking(move |conn| SegmentRepository::transcript(conn, meeting_id)).await
    }

    async fn insert_segment(&self, segment: NewSegment) -> Result<i64> {
        blocking(move |conn| SegmentRepository::insert(conn, &segment)).await
    }
}
