//! Post-meeting summarization.
//!
//! Formats a finished transcript and asks a completion backend for a
//! structured summary. Backend failures propagate to the caller; the
//! session machine treats them as log-and-ignore so a failed summary never
//! blocks the recording lifecycle.

pub mod anthropic;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::db::StoredSegment;

pub use anthropic::AnthropicBackend;

pub const EMPTY_TRANSCRIPT_FALLBACK: &str = "No transcript available.";

/// Text-completion backend behind the summarizer.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

fn format_timestamp(timestamp_ms: i64) -> String {
    let total_seconds = timestamp_ms.max(0) / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// One transcript line per segment: `[mm:ss] speaker: text`.
fn format_transcript(transcript: &[StoredSegment]) -> String {
    transcript
        .iter()
        .map(|segment| {
            format!(
                "[{}] {}: {}",
                format_timestamp(segment.timestamp_ms),
                segment.speaker,
                segment.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_prompt(formatted_transcript: &str) -> String {
    format!(
        "You are an expert meeting summarizer. Analyze the following meeting transcript and provide a comprehensive summary.

TRANSCRIPT:
{formatted_transcript}

Please provide a summary with the following sections:

## Overview
A brief 2-3 sentence overview of what the meeting was about.

## Key Discussion Points
Bullet points of the main topics discussed.

## Decisions Made
Any decisions that were reached during the meeting.

## Action Items
Tasks or follow-ups mentioned, with the responsible person if identified.

## Notable Quotes
Any particularly important or memorable statements (optional, include only if relevant).

Keep the summary concise but informative. Use clear, professional language."
    )
}

fn action_items_prompt(transcript: &[StoredSegment]) -> String {
    let lines = transcript
        .iter()
        .map(|segment| format!("{}: {}", segment.speaker, segment.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Extract action items from this meeting transcript. Return ONLY a JSON array of strings, each being an action item. Include the responsible person if mentioned.

TRANSCRIPT:
{lines}

Return format: [\"Action item 1\", \"Action item 2\", ...]"
    )
}

pub struct SummaryService {
    backend: Box<dyn CompletionBackend>,
}

impl SummaryService {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Summarize a finished transcript. An empty transcript returns the
    /// fixed fallback without a backend call.
    pub async fn generate_summary(&self, transcript: &[StoredSegment]) -> Result<String> {
        if transcript.is_empty() {
            return Ok(EMPTY_TRANSCRIPT_FALLBACK.to_string());
        }

        let prompt = summary_prompt(&format_transcript(transcript));
        let summary = self.backend.complete(&prompt).await?;

        info!("Generated summary: {} chars", summary.len());
        Ok(summary)
    }

    /// Extract action items as a plain list of strings. The backend must
    /// answer with a literal JSON array; anything else yields an empty list
    /// rather than an error.
    pub async fn generate_action_items(&self, transcript: &[StoredSegment]) -> Vec<String> {
        if transcript.is_empty() {
            return Vec::new();
        }

        let prompt = action_items_prompt(transcript);
        let response = match self.backend.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Action item extraction failed: {e:#}");
                return Vec::new();
            }
        };

        serde_json::from_str(response.trim()).unwrap_or_default()
    }
}
