//! Live transcription stream contract and processing.
//!
//! A provider turns a bidirectional audio connection into a sequence of
//! [`RecognitionEvent`]s; the processor reconciles that sequence into
//! speaker-labeled transcript segments. One stream per recording session;
//! a dropped stream is not reconnected, a new session opens a new one.

pub mod processor;
pub mod providers;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use processor::TranscriptStreamProcessor;
pub use providers::deepgram::DeepgramConnector;

/// One recognition result from the provider.
///
/// Interim events are revisions-in-progress of the current utterance; only
/// final events are durable. Diarization and confidence are optional
/// provider features.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionEvent {
    pub text: String,
    pub is_final: bool,
    pub speaker_index: Option<u32>,
    pub confidence: Option<f64>,
}

/// Outbound half of a live transcription connection.
#[async_trait]
pub trait TranscriptStream: Send {
    /// Forward a chunk of captured PCM audio to the recognizer.
    async fn send_audio(&mut self, chunk: Vec<u8>) -> Result<()>;

    /// Finalize the stream. No further events will be produced after the
    /// provider processes the close.
    async fn close(&mut self) -> Result<()>;
}

/// Opens live transcription streams. One connect call per recording session.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(
        &self,
    ) -> Result<(Box<dyn TranscriptStream>, mpsc::Receiver<RecognitionEvent>)>;
}
