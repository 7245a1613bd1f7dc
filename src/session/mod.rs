//! Recording session lifecycle.
//!
//! Exactly one session may record at a time, process-wide. Every trigger
//! (manual API calls, tray commands, detector transitions) arrives as an
//! [`AppCommand`] on one channel with a single consumer, so session
//! transitions can never interleave.

pub mod session_machine;
pub mod status;

use thiserror::Error;

pub use session_machine::{SessionMachine, StartOutcome, StopOutcome};
pub use status::{SessionPhase, SessionState, SessionStatusHandle};

/// Commands accepted from the host shell and the activity monitor.
#[derive(Debug)]
pub enum AppCommand {
    StartRecording { title: Option<String> },
    StopRecording,
    FeedAudio { data: Vec<u8>, is_user: bool },
    MeetingDetected { app_name: String },
    MeetingVanished,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// No transcription backend is configured; recording cannot start and
    /// no meeting record is created.
    #[error("no transcription backend is configured")]
    StreamUnavailable,

    /// The transcription backend refused the connection. No meeting record
    /// is created; a later start attempt opens a fresh connection.
    #[error("failed to connect transcription stream: {0:#}")]
    StreamConnection(anyhow::Error),

    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),
}
