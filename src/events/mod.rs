//! Typed notifications emitted by the core to its host shell.
//!
//! Replaces the callback-per-listener style with a broadcast channel of
//! `AppEvent` values; subscribers live as long as their receiver. Events are
//! serializable so the API layer can forward them verbatim over SSE.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A transcript segment surfaced to listeners.
///
/// `id` is present only for final, persisted segments. Interim segments have
/// no identity; listeners should replace the prior interim display for the
/// utterance rather than append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSegment {
    pub id: Option<i64>,
    pub meeting_id: i64,
    pub speaker: String,
    pub text: String,
    pub timestamp_ms: i64,
    pub is_user: bool,
    pub confidence: f64,
}

impl LiveSegment {
    pub fn is_final(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AppEvent {
    MeetingStarted { app_name: String },
    MeetingEnded,
    RecordingStarted { meeting_id: i64, title: String },
    RecordingStopped { meeting_id: i64 },
    TranscriptSegment(LiveSegment),
    TranscriptionReady,
    TranscriptionStopped,
}

/// Broadcast bus for [`AppEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
