//! Session state shared between the machine and API handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Recording,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
        }
    }
}

/// Current recording session, readable by API handlers.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub meeting_id: Option<i64>,
    pub title: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            meeting_id: None,
            title: None,
            started_at: None,
        }
    }
}

impl SessionState {
    pub fn is_recording(&self) -> bool {
        self.phase == SessionPhase::Recording
    }

    /// Elapsed seconds since the session started.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Thread-safe handle for sharing session state.
#[derive(Clone, Default)]
pub struct SessionStatusHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStatusHandle {
    pub async fn get(&self) -> SessionState {
        self.inner.lock().await.clone()
    }

    pub async fn start_recording(&self, meeting_id: i64, title: String) {
        let mut state = self.inner.lock().await;
        state.phase = SessionPhase::Recording;
        state.meeting_id = Some(meeting_id);
        state.title = Some(title);
        state.started_at = Some(Utc::now());
    }

    pub async fn clear(&self) {
        let mut state = self.inner.lock().await;
        *state = SessionState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_as_str() {
        assert_eq!(SessionPhase::Idle.as_str(), "idle");
        assert_eq!(SessionPhase::Recording.as_str(), "recording");
    }

    #[test]
    fn test_default_state_is_idle() {
        let state = SessionState::default();
        assert_eq!(state.phase, SessionPhase::Idle);
        assert!(!state.is_recording());
        assert!(state.meeting_id.is_none());
        assert!(state.duration_seconds().is_none());
    }

    #[tokio::test]
    async fn test_start_recording_populates_state() {
        let handle = SessionStatusHandle::default();
        handle.start_recording(7, "Standup".to_string()).await;

        let state = handle.get().await;
        assert!(state.is_recording());
        assert_eq!(state.meeting_id, Some(7));
        assert_eq!(state.title, Some("Standup".to_string()));
        assert!(state.started_at.is_some());
        assert!(state.duration_seconds().is_some());
    }

    #[tokio::test]
    async fn test_clear_returns_to_idle() {
        let handle = SessionStatusHandle::default();
        handle.start_recording(7, "Standup".to_string()).await;
        handle.clear().await;

        let state = handle.get().await;
        assert_eq!(state.phase, SessionPhase::Idle);
        assert!(state.meeting_id.is_none());
        assert!(state.title.is_none());
    }
}
