//! Deepgram live transcription over websocket.
//!
//! Audio goes out as binary frames; recognition results come back as JSON
//! text frames with interim/final flags and word-level speaker indices when
//! diarization is enabled. A connection failure ends the event stream; the
//! session machine opens a fresh connection for the next recording.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::super::{RecognitionEvent, StreamConnector, TranscriptStream};
use crate::config::TranscriptionConfig;

const DEFAULT_ENDPOINT: &str = "wss://api.deepgram.com/v1/listen";

#[derive(Debug, Deserialize)]
struct LiveResponse {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    is_final: bool,
    channel: Option<LiveChannel>,
}

#[derive(Debug, Deserialize)]
struct LiveChannel {
    alternatives: Vec<LiveAlternative>,
}

#[derive(Debug, Deserialize)]
struct LiveAlternative {
    transcript: String,
    confidence: Option<f64>,
    words: Option<Vec<LiveWord>>,
}

#[derive(Debug, Deserialize)]
struct LiveWord {
    speaker: Option<u32>,
}

fn parse_live_message(text: &str) -> Option<RecognitionEvent> {
    let response: LiveResponse = match serde_json::from_str(text) {
        Ok(response) => response,
        Err(e) => {
            debug!("Ignoring unparseable live message: {e}");
            return None;
        }
    };

    // Metadata, UtteranceEnd and SpeechStarted frames carry no transcript
    if response.kind.as_deref() != Some("Results") {
        return None;
    }

    let alternative = response.channel?.alternatives.into_iter().next()?;
    let speaker_index = alternative
        .words
        .as_ref()
        .and_then(|words| words.first())
        .and_then(|word| word.speaker);

    Some(RecognitionEvent {
        text: alternative.transcript,
        is_final: response.is_final,
        speaker_index,
        confidence: alternative.confidence,
    })
}

enum StreamCommand {
    Audio(Vec<u8>),
    Close,
}

pub struct DeepgramStream {
    commands: mpsc::Sender<StreamCommand>,
}

#[async_trait]
impl TranscriptStream for DeepgramStream {
    async fn send_audio(&mut self, chunk: Vec<u8>) -> Result<()> {
        self.commands
            .send(StreamCommand::Audio(chunk))
            .await
            .map_err(|_| anyhow::anyhow!("transcription stream is no longer active"))
    }

    async fn close(&mut self) -> Result<()> {
        // The writer task may already be gone after a connection error
        let _ = self.commands.send(StreamCommand::Close).await;
        Ok(())
    }
}

/// Opens Deepgram live connections configured for diarized, interim-result
/// streaming of linear16 PCM.
pub struct DeepgramConnector {
    api_key: String,
    endpoint: String,
    model: String,
    language: String,
    sample_rate: u32,
}

impl DeepgramConnector {
    pub fn new(api_key: String, config: &TranscriptionConfig) -> Self {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        info!("Initialized Deepgram connector with endpoint: {endpoint}");

        Self {
            api_key,
            endpoint,
            model: config.model.clone(),
            language: config.language.clone(),
            sample_rate: config.sample_rate,
        }
    }

    fn listen_url(&self) -> String {
        format!(
            "{}?model={}&language={}&smart_format=true&punctuate=true&diarize=true\
             &interim_results=true&utterance_end_ms=1000&vad_events=true\
             &encoding=linear16&sample_rate={}&channels=1",
            self.endpoint, self.model, self.language, self.sample_rate
        )
    }
}

#[async_trait]
impl StreamConnector for DeepgramConnector {
    async fn connect(
        &self,
    ) -> Result<(Box<dyn TranscriptStream>, mpsc::Receiver<RecognitionEvent>)> {
        let mut request = self
            .listen_url()
            .into_client_request()
            .context("Invalid transcription endpoint")?;
        request.headers_mut().insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Token {}", self.api_key))
                .context("Invalid transcription API key")?,
        );

        let (socket, _) = connect_async(request)
            .await
            .context("Failed to connect to transcription backend")?;
        info!("Transcription stream connected");

        let (mut sink, mut source) = socket.split();
        let (command_tx, mut command_rx) = mpsc::channel::<StreamCommand>(64);
        let (event_tx, event_rx) = mpsc::channel::<RecognitionEvent>(256);

        // Writer: forwards audio until closed or the socket errors out
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    StreamCommand::Audio(chunk) => {
                        if let Err(e) = sink.send(Message::Binary(chunk)).await {
                            error!("Transcription stream send failed: {e}");
                            break;
                        }
                    }
                    StreamCommand::Close => {
                        let _ = sink
                            .send(Message::Text(r#"{"type":"CloseStream"}"#.to_string()))
                            .await;
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        // Reader: parses recognition results until the socket ends
        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if let Some(event) = parse_live_message(&text) {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("Transcription stream closed by provider");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // No reconnection; the stream is inactive from here on
                        warn!("Transcription stream connection error: {e}");
                        break;
                    }
                }
            }
        });

        Ok((Box::new(DeepgramStream { commands: command_tx }), event_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_final_result_with_diarization() {
        let event = parse_live_message(
            r#"{
                "type": "Results",
                "is_final": true,
                "channel": {
                    "alternatives": [{
                        "transcript": "hello everyone",
                        "confidence": 0.97,
                        "words": [{"word": "hello", "speaker": 1}]
                    }]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(event.text, "hello everyone");
        assert!(event.is_final);
        assert_eq!(event.speaker_index, Some(1));
        assert_eq!(event.confidence, Some(0.97));
    }

    #[test]
    fn test_parse_interim_without_diarization() {
        let event = parse_live_message(
            r#"{
                "type": "Results",
                "is_final": false,
                "channel": {"alternatives": [{"transcript": "hel"}]}
            }"#,
        )
        .unwrap();

        assert_eq!(event.text, "hel");
        assert!(!event.is_final);
        assert_eq!(event.speaker_index, None);
        assert_eq!(event.confidence, None);
    }

    #[test]
    fn test_parse_ignores_metadata_frames() {
        assert!(parse_live_message(r#"{"type": "Metadata", "request_id": "abc"}"#).is_none());
        assert!(parse_live_message(r#"{"type": "UtteranceEnd"}"#).is_none());
        assert!(parse_live_message("not json").is_none());
    }

    #[test]
    fn test_listen_url_carries_session_parameters() {
        let config = TranscriptionConfig::default();
        let connector = DeepgramConnector::new("key".to_string(), &config);
        let url = connector.listen_url();

        assert!(url.starts_with("wss://api.deepgram.com/v1/listen?"));
        assert!(url.contains("model=nova-2"));
        assert!(url.contains("diarize=true"));
        assert!(url.contains("interim_results=true"));
        assert!(url.contains("sample_rate=16000"));
    }

    #[test]
    fn test_endpoint_override() {
        let config = TranscriptionConfig {
            endpoint: Some("ws://127.0.0.1:9999/listen".to_string()),
            ..TranscriptionConfig::default()
        };
        let connector = DeepgramConnector::new("key".to_string(), &config);
        assert!(connector.listen_url().starts_with("ws://127.0.0.1:9999/listen?"));
    }
}
