//! REST API server, the host shell surface of the core.
//!
//! Provides HTTP endpoints for:
//! - Recording control (start, stop, status, audio ingestion)
//! - Meeting management (list, search, get, delete, regenerate summary)
//! - Host shell settings
//! - A server-sent-events stream of core notifications

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

use crate::events::EventBus;
use crate::session::{AppCommand, SessionStatusHandle};
use crate::summary::SummaryService;

pub use routes::recording::RecordingState;

pub struct ApiServer {
    port: u16,
    recording_state: RecordingState,
    events: EventBus,
    summary: Option<Arc<SummaryService>>,
}

impl ApiServer {
    pub fn new(
        tx: tokio::sync::mpsc::Sender<AppCommand>,
        status: SessionStatusHandle,
        events: EventBus,
        summary: Option<Arc<SummaryService>>,
        port: u16,
    ) -> Self {
        Self {
            port,
            recording_state: RecordingState { tx, status },
            events,
            summary,
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::recording::router(self.recording_state))
            .merge(routes::meetings::router(routes::meetings::MeetingsState {
                summary: self.summary,
            }))
            .merge(routes::settings::router())
            .merge(routes::events::router(self.events))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                      - Service info");
        info!("  POST /recording/start       - Start recording");
        info!("  POST /recording/stop        - Stop recording");
        info!("  GET  /recording/status      - Get recording status");
        info!("  POST /recording/audio       - Feed an audio chunk");
        info!("  GET  /meetings              - List meetings");
        info!("  GET  /meetings/search       - Search meetings");
        info!("  GET  /meetings/:id          - Get meeting with transcript");
        info!("  DELETE /meetings/:id        - Delete meeting");
        info!("  POST /meetings/:id/summary  - Regenerate summary");
        info!("  GET  /meetings/:id/action-items - Extract action items");
        info!("  GET  /settings              - Get host shell settings");
        info!("  PUT  /settings              - Update host shell settings");
        info!("  GET  /events                - Notification stream (SSE)");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "meetscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "meetscribe"
    }))
}
