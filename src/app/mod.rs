//! Service wiring and the app command loop.
//!
//! Builds every component from config and then drains a single command
//! channel. The loop is the only caller of the session machine, so manual
//! API triggers and detector transitions can never interleave a start with
//! a stop.

use crate::api::ApiServer;
use crate::config::Config;
use crate::db::{self, PersistenceGateway, SqliteGateway};
use crate::detector::{default_registry, MeetingActivityMonitor, SystemProbe};
use crate::events::EventBus;
use crate::session::{AppCommand, SessionMachine, SessionStatusHandle, StartOutcome, StopOutcome};
use crate::summary::{AnthropicBackend, SummaryService};
use crate::transcription::{DeepgramConnector, StreamConnector};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn run_service() -> Result<()> {
    info!("Starting MeetScribe service");

    let config = Config::load()?;

    // Fail fast if the schema cannot be created
    db::init_db()?;

    let (tx, mut rx) = mpsc::channel::<AppCommand>(64);
    let events = EventBus::default();
    let status = SessionStatusHandle::default();
    let gateway: Arc<dyn PersistenceGateway> = Arc::new(SqliteGateway);

    let connector = build_connector(&config);
    if connector.is_none() {
        warn!("No transcription API key configured; recording is disabled until one is set");
    }

    let summary = build_summary_service(&config);
    if summary.is_none() {
        warn!("No summarization API key configured; meetings will not be summarized");
    }

    let mut machine = SessionMachine::new(
        gateway,
        connector,
        summary.clone(),
        status.clone(),
        events.clone(),
    );

    let api_server = ApiServer::new(
        tx.clone(),
        status.clone(),
        events.clone(),
        summary,
        config.api.port,
    );
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    let mut monitor = MeetingActivityMonitor::new(
        Arc::new(SystemProbe),
        default_registry(),
        Duration::from_millis(config.detector.poll_interval_ms),
        tx.clone(),
    );
    if config.detector.enabled {
        monitor.start();
    }

    info!("MeetScribe is ready");
    info!(
        "Start a recording: curl -X POST http://127.0.0.1:{}/recording/start",
        config.api.port
    );

    while let Some(command) = rx.recv().await {
        match command {
            AppCommand::StartRecording { title } => match machine.start(title).await {
                Ok(StartOutcome::Started { meeting_id }) => {
                    info!("Recording meeting {meeting_id}");
                }
                Ok(StartOutcome::AlreadyRecording { meeting_id }) => {
                    info!("Already recording meeting {meeting_id}");
                }
                Err(e) => error!("Failed to start recording: {e}"),
            },
            AppCommand::StopRecording => match machine.stop().await {
                Ok(StopOutcome::Stopped { meeting_id }) => {
                    info!("Stopped recording meeting {meeting_id}");
                }
                Ok(StopOutcome::NotRecording) => info!("No recording in progress"),
                Err(e) => error!("Failed to stop recording: {e}"),
            },
            AppCommand::FeedAudio { data, is_user } => {
                if let Err(e) = machine.feed_audio(data, is_user).await {
                    error!("Failed to forward audio chunk: {e:#}");
                }
            }
            AppCommand::MeetingDetected { app_name } => {
                machine.meeting_detected(&app_name);
            }
            AppCommand::MeetingVanished => {
                if let Err(e) = machine.meeting_vanished().await {
                    error!("Failed to stop recording after meeting ended: {e}");
                }
            }
        }
    }

    Ok(())
}

fn build_connector(config: &Config) -> Option<Arc<dyn StreamConnector>> {
    let api_key = config.transcription.api_key.clone()?;
    Some(Arc::new(DeepgramConnector::new(
        api_key,
        &config.transcription,
    )))
}

fn build_summary_service(config: &Config) -> Option<Arc<SummaryService>> {
    let api_key = config.summary.api_key.clone()?;
    let backend = AnthropicBackend::new(api_key, &config.summary);
    Some(Arc::new(SummaryService::new(Box::new(backend))))
}
