//! Reconciles a provider's recognition event sequence into a persisted,
//! speaker-labeled transcript.
//!
//! Final events with text become durable segments, persisted in arrival
//! order; interim events are surfaced for live display only. Timestamps are
//! elapsed milliseconds against the session clock, assigned at processing
//! time. Once closed, the processor drops everything: events racing the
//! close are an accepted loss, matching the no-drain stop semantics.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::db::{NewSegment, PersistenceGateway};
use crate::events::{AppEvent, EventBus, LiveSegment};

use super::{RecognitionEvent, TranscriptStream};

/// Speaker attribution for one event.
///
/// A segment counts as the user's speech when the provider diarized it as
/// the primary speaker (index 0) OR the most recent audio chunk was flagged
/// as microphone input. Either signal alone is sufficient; when the two
/// disagree there is deliberately no tie-break.
fn attribute_speaker(speaker_index: u32, user_source_hint: bool) -> (bool, String) {
    let is_user = speaker_index == 0 || user_source_hint;
    let speaker = if is_user {
        "You".to_string()
    } else {
        format!("Speaker {}", speaker_index + 1)
    };
    (is_user, speaker)
}

/// Per-event reconciliation shared between the pump task and tests.
struct SegmentIngest {
    meeting_id: i64,
    gateway: Arc<dyn PersistenceGateway>,
    events: EventBus,
    user_source_hint: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl SegmentIngest {
    /// Handle one recognition event at the given elapsed time.
    ///
    /// Persistence failures propagate; the caller decides whether the
    /// stream stays up.
    async fn handle_event_at(&self, event: RecognitionEvent, timestamp_ms: i64) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let text = event.text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let speaker_index = event.speaker_index.unwrap_or(0);
        let user_source_hint = self.user_source_hint.load(Ordering::SeqCst);
        let (is_user, speaker) = attribute_speaker(speaker_index, user_source_hint);
        let confidence = event.confidence.unwrap_or(1.0);

        let mut segment = LiveSegment {
            id: None,
            meeting_id: self.meeting_id,
            speaker,
            text: text.to_string(),
            timestamp_ms,
            is_user,
            confidence,
        };

        if event.is_final {
            let id = self
                .gateway
                .insert_segment(NewSegment {
                    meeting_id: segment.meeting_id,
                    speaker: segment.speaker.clone(),
                    text: segment.text.clone(),
                    timestamp_ms: segment.timestamp_ms,
                    is_user: segment.is_user,
                    confidence: segment.confidence,
                })
                .await?;
            segment.id = Some(id);
        }

        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.events.emit(AppEvent::TranscriptSegment(segment));
        Ok(())
    }
}

/// Owns one live transcription stream for the duration of a session.
pub struct TranscriptStreamProcessor {
    stream: Box<dyn TranscriptStream>,
    user_source_hint: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    pump: Option<JoinHandle<()>>,
}

impl TranscriptStreamProcessor {
    /// Bind a connected stream to a meeting and start consuming its events.
    /// `session_start` anchors every segment's elapsed timestamp.
    pub fn spawn(
        meeting_id: i64,
        session_start: Instant,
        stream: Box<dyn TranscriptStream>,
        mut recognition_events: mpsc::Receiver<RecognitionEvent>,
        gateway: Arc<dyn PersistenceGateway>,
        events: EventBus,
    ) -> Self {
        let user_source_hint = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());

        let ingest = SegmentIngest {
            meeting_id,
            gateway,
            events,
            user_source_hint: Arc::clone(&user_source_hint),
            closed: Arc::clone(&closed),
        };
        let shutdown_signal = Arc::clone(&shutdown);

        // Events are handled one at a time so segments persist in arrival
        // order even when the DB write is slow.
        let pump = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = shutdown_signal.notified() => break,
                    event = recognition_events.recv() => match event {
                        Some(event) => event,
                        None => {
                            debug!("Recognition event stream ended");
                            break;
                        }
                    },
                };

                if ingest.closed.load(Ordering::SeqCst) {
                    break;
                }

                let timestamp_ms = session_start.elapsed().as_millis() as i64;
                if let Err(e) = ingest.handle_event_at(event, timestamp_ms).await {
                    error!("Failed to record transcript segment: {e:#}");
                }
            }
        });

        Self {
            stream,
            user_source_hint,
            closed,
            shutdown,
            pump: Some(pump),
        }
    }

    /// Forward an audio chunk and remember its source as the latest
    /// user-vs-remote hint for speaker attribution.
    pub async fn feed_audio(&mut self, chunk: Vec<u8>, is_user_source: bool) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.user_source_hint
            .store(is_user_source, Ordering::SeqCst);
        self.stream.send_audio(chunk).await
    }

    /// Finalize the stream. Events that race the close are dropped, not
    /// queued; nothing persists or notifies after this returns.
    pub async fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // notify_one stores a permit, so the pump cannot miss the shutdown
        // even if it is mid-event when this runs
        self.shutdown.notify_one();

        if let Err(e) = self.stream.close().await {
            warn!("Failed to close transcription stream: {e:#}");
        }

        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                warn!("Transcript pump task failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::gateway::testing::MemoryGateway;
    use tokio::sync::broadcast::error::TryRecvError;

    struct NullStream;

    #[async_trait::async_trait]
    impl TranscriptStream for NullStream {
        async fn send_audio(&mut self, _chunk: Vec<u8>) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn final_event(text: &str, speaker_index: Option<u32>) -> RecognitionEvent {
        RecognitionEvent {
            text: text.to_string(),
            is_final: true,
            speaker_index,
            confidence: Some(0.9),
        }
    }

    fn interim_event(text: &str) -> RecognitionEvent {
        RecognitionEvent {
            text: text.to_string(),
            is_final: false,
            speaker_index: None,
            confidence: None,
        }
    }

    fn ingest(gateway: Arc<MemoryGateway>, events: EventBus) -> SegmentIngest {
        SegmentIngest {
            meeting_id: 1,
            gateway,
            events,
            user_source_hint: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn test_primary_speaker_is_user() {
        let (is_user, speaker) = attribute_speaker(0, false);
        assert!(is_user);
        assert_eq!(speaker, "You");
    }

    #[test]
    fn test_user_source_hint_overrides_diarization() {
        let (is_user, speaker) = attribute_speaker(2, true);
        assert!(is_user);
        assert_eq!(speaker, "You");
    }

    #[test]
    fn test_remote_speaker_label() {
        let (is_user, speaker) = attribute_speaker(2, false);
        assert!(!is_user);
        assert_eq!(speaker, "Speaker 3");
    }

    #[tokio::test]
    async fn test_final_event_persists_and_notifies_with_identity() {
        let gateway = Arc::new(MemoryGateway::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let ingest = ingest(Arc::clone(&gateway), bus);

        ingest
            .handle_event_at(final_event("hello", Some(0)), 5000)
            .await
            .unwrap();

        let stored = gateway.segments.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "hello");
        assert_eq!(stored[0].timestamp_ms, 5000);
        assert_eq!(stored[0].speaker, "You");
        assert!(stored[0].is_user);
        assert_eq!(stored[0].confidence, 0.9);

        match rx.try_recv().unwrap() {
            AppEvent::TranscriptSegment(segment) => {
                assert_eq!(segment.id, Some(stored[0].id));
                assert_eq!(segment.timestamp_ms, 5000);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_interim_event_notifies_without_persisting() {
        let gateway = Arc::new(MemoryGateway::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let ingest = ingest(Arc::clone(&gateway), bus);

        ingest
            .handle_event_at(interim_event("hel"), 1200)
            .await
            .unwrap();

        assert!(gateway.segments.lock().unwrap().is_empty());

        match rx.try_recv().unwrap() {
            AppEvent::TranscriptSegment(segment) => {
                assert_eq!(segment.id, None);
                assert_eq!(segment.text, "hel");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_text_is_dropped() {
        let gateway = Arc::new(MemoryGateway::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let ingest = ingest(Arc::clone(&gateway), bus);

        ingest
            .handle_event_at(final_event("", Some(0)), 100)
            .await
            .unwrap();
        ingest
            .handle_event_at(final_event("   ", Some(0)), 200)
            .await
            .unwrap();

        assert!(gateway.segments.lock().unwrap().is_empty());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_defaults_without_diarization_or_confidence() {
        let gateway = Arc::new(MemoryGateway::new());
        let ingest = ingest(Arc::clone(&gateway), EventBus::default());

        ingest
            .handle_event_at(
                RecognitionEvent {
                    text: "plain".to_string(),
                    is_final: true,
                    speaker_index: None,
                    confidence: None,
                },
                300,
            )
            .await
            .unwrap();

        let stored = gateway.segments.lock().unwrap().clone();
        // Missing diarization defaults to the primary speaker
        assert_eq!(stored[0].speaker, "You");
        assert!(stored[0].is_user);
        assert_eq!(stored[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn test_segments_persist_in_arrival_order() {
        let gateway = Arc::new(MemoryGateway::new());
        let ingest = ingest(Arc::clone(&gateway), EventBus::default());

        // Out-of-order elapsed times persist as delivered, not re-sorted
        ingest
            .handle_event_at(final_event("first", Some(1)), 1000)
            .await
            .unwrap();
        ingest
            .handle_event_at(final_event("second", Some(1)), 2000)
            .await
            .unwrap();
        ingest
            .handle_event_at(final_event("third", Some(1)), 1500)
            .await
            .unwrap();

        let stored = gateway.segments.lock().unwrap().clone();
        assert_eq!(gateway.segment_texts(), vec!["first", "second", "third"]);
        assert_eq!(
            stored.iter().map(|s| s.timestamp_ms).collect::<Vec<_>>(),
            vec![1000, 2000, 1500]
        );
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.fail_segment_inserts.store(true, Ordering::SeqCst);
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let ingest = ingest(Arc::clone(&gateway), bus);

        let result = ingest.handle_event_at(final_event("lost", Some(0)), 100).await;
        assert!(result.is_err());
        // A failed persist must not announce the segment
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_events_after_close_are_ignored() {
        let gateway = Arc::new(MemoryGateway::new());
        let bus = EventBus::default();
        let mut bus_rx = bus.subscribe();
        let (event_tx, event_rx) = mpsc::channel(8);

        let mut processor = TranscriptStreamProcessor::spawn(
            1,
            Instant::now(),
            Box::new(NullStream),
            event_rx,
            Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
            bus,
        );

        processor.close().await;

        // Racing events delivered after close never surface
        let _ = event_tx.send(final_event("too late", Some(0))).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(gateway.segments.lock().unwrap().is_empty());
        assert!(matches!(bus_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let gateway = Arc::new(MemoryGateway::new());
        let (_event_tx, event_rx) = mpsc::channel(8);

        let mut processor = TranscriptStreamProcessor::spawn(
            1,
            Instant::now(),
            Box::new(NullStream),
            event_rx,
            gateway as Arc<dyn PersistenceGateway>,
            EventBus::default(),
        );

        processor.close().await;
        processor.close().await;
    }

    #[tokio::test]
    async fn test_pump_persists_streamed_events() {
        let gateway = Arc::new(MemoryGateway::new());
        let bus = EventBus::default();
        let mut bus_rx = bus.subscribe();
        let (event_tx, event_rx) = mpsc::channel(8);

        let mut processor = TranscriptStreamProcessor::spawn(
            1,
            Instant::now(),
            Box::new(NullStream),
            event_rx,
            Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
            bus,
        );

        event_tx.send(final_event("streamed", Some(1))).await.unwrap();

        match bus_rx.recv().await.unwrap() {
            AppEvent::TranscriptSegment(segment) => {
                assert!(segment.id.is_some());
                assert_eq!(segment.text, "streamed");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(gateway.segment_texts(), vec!["streamed"]);

        processor.close().await;
    }

    #[tokio::test]
    async fn test_feed_audio_updates_source_hint() {
        let gateway = Arc::new(MemoryGateway::new());
        let bus = EventBus::default();
        let mut bus_rx = bus.subscribe();
        let (event_tx, event_rx) = mpsc::channel(8);

        let mut processor = TranscriptStreamProcessor::spawn(
            1,
            Instant::now(),
            Box::new(NullStream),
            event_rx,
            Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
            bus,
        );

        processor.feed_audio(vec![0u8; 4], true).await.unwrap();
        event_tx.send(final_event("mic speech", Some(3))).await.unwrap();

        match bus_rx.recv().await.unwrap() {
            AppEvent::TranscriptSegment(segment) => {
                // Hint marks the segment as user speech despite diarization
                assert!(segment.is_user);
                assert_eq!(segment.speaker, "You");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        processor.close().await;
    }
}
