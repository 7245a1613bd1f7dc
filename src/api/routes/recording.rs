//! Recording control endpoints.
//!
//! Provides HTTP endpoints for:
//! - Starting recording (POST /recording/start)
//! - Stopping recording (POST /recording/stop)
//! - Getting recording status (GET /recording/status)
//! - Feeding captured audio (POST /recording/audio)
//!
//! Handlers only enqueue commands; the app command loop is the single
//! control point that drives the session machine.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::session::{AppCommand, SessionStatusHandle};

/// Request body for the start endpoint.
#[derive(Debug, Default, serde::Deserialize)]
pub struct StartRequest {
    pub title: Option<String>,
}

/// Request body for the audio chunk endpoint. PCM bytes, base64-encoded.
#[derive(Debug, serde::Deserialize)]
pub struct AudioChunkRequest {
    pub data: String,
    #[serde(default)]
    pub is_user: bool,
}

#[derive(Clone)]
pub struct RecordingState {
    pub tx: mpsc::Sender<AppCommand>,
    pub status: SessionStatusHandle,
}

pub fn router(state: RecordingState) -> Router {
    Router::new()
        .route("/recording/start", post(start_recording))
        .route("/recording/stop", post(stop_recording))
        .route("/recording/status", get(recording_status))
        .route("/recording/audio", post(feed_audio))
        .with_state(state)
}

async fn start_recording(
    State(state): State<RecordingState>,
    body: Option<Json<StartRequest>>,
) -> ApiResult<Json<Value>> {
    let title = body.and_then(|Json(req)| req.title);

    info!("Recording start command received via API");

    state
        .tx
        .send(AppCommand::StartRecording { title })
        .await
        .map_err(|_| ApiError::internal("app command channel closed"))?;

    // Give the command loop a moment to process
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    let status = state.status.get().await;
    Ok(Json(json!({
        "success": true,
        "recording": status.is_recording(),
        "meeting_id": status.meeting_id,
        "title": status.title,
    })))
}

async fn stop_recording(State(state): State<RecordingState>) -> ApiResult<Json<Value>> {
    info!("Recording stop command received via API");

    state
        .tx
        .send(AppCommand::StopRecording)
        .await
        .map_err(|_| ApiError::internal("app command channel closed"))?;

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    let status = state.status.get().await;
    Ok(Json(json!({
        "success": true,
        "recording": status.is_recording(),
    })))
}

async fn recording_status(State(state): State<RecordingState>) -> Json<Value> {
    let status = state.status.get().await;

    Json(json!({
        "recording": status.is_recording(),
        "phase": status.phase.as_str(),
        "meeting_id": status.meeting_id,
        "title": status.title,
        "duration_seconds": status.duration_seconds(),
    }))
}

async fn feed_audio(
    State(state): State<RecordingState>,
    Json(body): Json<AudioChunkRequest>,
) -> ApiResult<Json<Value>> {
    let data = BASE64
        .decode(&body.data)
        .map_err(|_| ApiError::bad_request("audio data is not valid base64"))?;

    state
        .tx
        .send(AppCommand::FeedAudio {
            data,
            is_user: body.is_user,
        })
        .await
        .map_err(|_| ApiError::internal("app command channel closed"))?;

    Ok(Json(json!({ "accepted": true })))
}
