//! Recording session state machine.
//!
//! Two states, Idle and Recording, for the lifetime of the process. Start
//! and stop are no-ops when called in the wrong state; the machine is driven
//! exclusively from the app command loop, which serializes every trigger.
//! Stopping finalizes the live transcript first, then kicks off
//! summarization in the background so the lifecycle transition never waits
//! on the summarization backend.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::db::PersistenceGateway;
use crate::events::{AppEvent, EventBus};
use crate::summary::SummaryService;
use crate::transcription::{StreamConnector, TranscriptStreamProcessor};

use super::status::{SessionState, SessionStatusHandle};
use super::SessionError;

const DEFAULT_TITLE: &str = "Manual Recording";

/// Result of a start request.
#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started { meeting_id: i64 },
    /// A session was already recording; nothing changed.
    AlreadyRecording { meeting_id: i64 },
}

/// Result of a stop request.
#[derive(Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { meeting_id: i64 },
    /// No session was recording; nothing changed.
    NotRecording,
}

struct ActiveSession {
    meeting_id: i64,
    processor: TranscriptStreamProcessor,
}

pub struct SessionMachine {
    gateway: Arc<dyn PersistenceGateway>,
    connector: Option<Arc<dyn StreamConnector>>,
    summary: Option<Arc<SummaryService>>,
    status: SessionStatusHandle,
    events: EventBus,
    active: Option<ActiveSession>,
}

impl SessionMachine {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        connector: Option<Arc<dyn StreamConnector>>,
        summary: Option<Arc<SummaryService>>,
        status: SessionStatusHandle,
        events: EventBus,
    ) -> Self {
        Self {
            gateway,
            connector,
            summary,
            status,
            events,
            active: None,
        }
    }

    /// Start a recording session.
    ///
    /// Recording already? No-op. No transcription backend configured? Fails
    /// before any meeting record exists.
    pub async fn start(&mut self, title: Option<String>) -> Result<StartOutcome, SessionError> {
        if let Some(active) = &self.active {
            debug!("Start requested while already recording, ignoring");
            return Ok(StartOutcome::AlreadyRecording {
                meeting_id: active.meeting_id,
            });
        }

        let connector = self
            .connector
            .as_ref()
            .ok_or(SessionError::StreamUnavailable)?;

        // Connect first so a refused stream leaves no meeting row behind
        let (stream, recognition_events) = connector
            .connect()
            .await
            .map_err(SessionError::StreamConnection)?;

        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let meeting_id = self
            .gateway
            .create_meeting(&title)
            .await
            .map_err(SessionError::Persistence)?;

        let processor = TranscriptStreamProcessor::spawn(
            meeting_id,
            Instant::now(),
            stream,
            recognition_events,
            Arc::clone(&self.gateway),
            self.events.clone(),
        );

        self.active = Some(ActiveSession {
            meeting_id,
            processor,
        });
        self.status.start_recording(meeting_id, title.clone()).await;

        info!("Recording started for meeting {meeting_id}: {title}");
        self.events.emit(AppEvent::RecordingStarted { meeting_id, title });
        self.events.emit(AppEvent::TranscriptionReady);

        Ok(StartOutcome::Started { meeting_id })
    }

    /// Stop the active session.
    ///
    /// The transcript stream is finalized and the meeting stamped before
    /// this returns; summarization runs afterwards in the background and
    /// cannot roll the transition back.
    pub async fn stop(&mut self) -> Result<StopOutcome, SessionError> {
        let Some(mut session) = self.active.take() else {
            debug!("Stop requested while idle, ignoring");
            return Ok(StopOutcome::NotRecording);
        };

        let meeting_id = session.meeting_id;
        session.processor.close().await;

        let ended = self.gateway.end_meeting(meeting_id).await;

        self.status.clear().await;
        info!("Recording stopped for meeting {meeting_id}");
        self.events.emit(AppEvent::RecordingStopped { meeting_id });
        self.events.emit(AppEvent::TranscriptionStopped);

        // Lifecycle completed above; a failed end-stamp still surfaces
        ended.map_err(SessionError::Persistence)?;

        self.spawn_summarization(meeting_id);

        Ok(StopOutcome::Stopped { meeting_id })
    }

    /// Current recording status. Pure read, no side effects.
    pub async fn status(&self) -> SessionState {
        self.status.get().await
    }

    /// Forward an audio chunk into the live session. Dropped while idle.
    pub async fn feed_audio(&mut self, data: Vec<u8>, is_user: bool) -> anyhow::Result<()> {
        match &mut self.active {
            Some(session) => session.processor.feed_audio(data, is_user).await,
            None => Ok(()),
        }
    }

    /// A meeting application appeared. Surfaced to the host shell so the
    /// user can opt in; never auto-starts a recording.
    pub fn meeting_detected(&self, app_name: &str) {
        self.events.emit(AppEvent::MeetingStarted {
            app_name: app_name.to_string(),
        });
    }

    /// The meeting application went away. Stops the session if one records.
    pub async fn meeting_vanished(&mut self) -> Result<StopOutcome, SessionError> {
        self.events.emit(AppEvent::MeetingEnded);
        self.stop().await
    }

    fn spawn_summarization(&self, meeting_id: i64) {
        let Some(summary) = self.summary.clone() else {
            debug!("No summarization backend configured, skipping summary");
            return;
        };
        let gateway = Arc::clone(&self.gateway);

        tokio::spawn(async move {
            let transcript = match gateway.transcript(meeting_id).await {
                Ok(transcript) => transcript,
                Err(e) => {
                    error!("Failed to load transcript for meeting {meeting_id}: {e:#}");
                    return;
                }
            };

            if transcript.is_empty() {
                debug!("Meeting {meeting_id} has no transcript, skipping summary");
                return;
            }

            match summary.generate_summary(&transcript).await {
                Ok(text) => {
                    if let Err(e) = gateway.set_summary(meeting_id, &text).await {
                        error!("Failed to store summary for meeting {meeting_id}: {e:#}");
                    }
                }
                Err(e) => {
                    // Summary stays null; the meeting record is already final
                    warn!("Summary generation failed for meeting {meeting_id}: {e:#}");
                }
            }
        });
    }
}
