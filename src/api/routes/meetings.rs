//! Meeting management endpoints.
//!
//! Provides HTTP endpoints for:
//! - Listing meetings (GET /meetings)
//! - Searching meetings (GET /meetings/search)
//! - Getting a meeting with its transcript (GET /meetings/:id)
//! - Deleting a meeting (DELETE /meetings/:id)
//! - Regenerating a meeting summary (POST /meetings/:id/summary)
//! - Extracting action items (GET /meetings/:id/action-items)

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::db::{self, MeetingRecord, MeetingRepository, SegmentRepository};
use crate::summary::SummaryService;

#[derive(Clone)]
pub struct MeetingsState {
    pub summary: Option<Arc<SummaryService>>,
}

pub fn router(state: MeetingsState) -> Router {
    Router::new()
        .route("/meetings", get(list_meetings))
        .route("/meetings/search", get(search_meetings))
        .route("/meetings/:id", get(get_meeting).delete(delete_meeting))
        .route("/meetings/:id/summary", post(regenerate_summary))
        .route("/meetings/:id/action-items", get(action_items))
        .with_state(state)
}

fn meeting_json(meeting: &MeetingRecord) -> Value {
    json!({
        "id": meeting.id,
        "title": meeting.title,
        "started_at": meeting.started_at,
        "ended_at": meeting.ended_at,
        "summary": meeting.summary,
        "duration_minutes": meeting.duration_minutes,
    })
}

async fn list_meetings(
    Query(params): Query<HashMap<String, String>>,
    State(_state): State<MeetingsState>,
) -> ApiResult<Json<Value>> {
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);
    let offset: usize = params
        .get("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let meetings = tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        MeetingRepository::list(&conn, limit, offset)
    })
    .await
    .map_err(|_| ApiError::internal("database task failed"))??;

    let entries: Vec<Value> = meetings.iter().map(meeting_json).collect();
    Ok(Json(json!({ "meetings": entries })))
}

async fn search_meetings(
    Query(params): Query<HashMap<String, String>>,
    State(_state): State<MeetingsState>,
) -> ApiResult<Json<Value>> {
    let query = params
        .get("q")
        .cloned()
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("missing search query parameter 'q'"))?;

    let meetings = tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        MeetingRepository::search(&conn, &query)
    })
    .await
    .map_err(|_| ApiError::internal("database task failed"))??;

    let entries: Vec<Value> = meetings.iter().map(meeting_json).collect();
    Ok(Json(json!({ "meetings": entries })))
}

async fn get_meeting(
    Path(id): Path<i64>,
    State(_state): State<MeetingsState>,
) -> ApiResult<Json<Value>> {
    let (meeting, transcript) = tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        let meeting = MeetingRepository::get(&conn, id)?;
        let transcript = SegmentRepository::transcript(&conn, id)?;
        anyhow::Ok((meeting, transcript))
    })
    .await
    .map_err(|_| ApiError::internal("database task failed"))??;

    let meeting = meeting.ok_or_else(|| ApiError::not_found("no such meeting"))?;

    let segments: Vec<Value> = transcript
        .iter()
        .map(|segment| {
            json!({
                "id": segment.id,
                "speaker": segment.speaker,
                "text": segment.text,
                "timestamp_ms": segment.timestamp_ms,
                "is_user": segment.is_user,
                "confidence": segment.confidence,
            })
        })
        .collect();

    let mut body = meeting_json(&meeting);
    body["transcript"] = Value::Array(segments);
    Ok(Json(body))
}

async fn delete_meeting(
    Path(id): Path<i64>,
    State(_state): State<MeetingsState>,
) -> ApiResult<Json<Value>> {
    let deleted = tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        MeetingRepository::delete(&conn, id)
    })
    .await
    .map_err(|_| ApiError::internal("database task failed"))??;

    if !deleted {
        return Err(ApiError::not_found("no such meeting"));
    }

    info!("Deleted meeting {id} and its transcript");
    Ok(Json(json!({ "deleted": true })))
}

async fn regenerate_summary(
    Path(id): Path<i64>,
    State(state): State<MeetingsState>,
) -> ApiResult<Json<Value>> {
    let summary_service = state
        .summary
        .ok_or_else(|| ApiError::bad_request("no summarization backend configured"))?;

    let transcript = tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        match MeetingRepository::get(&conn, id)? {
            Some(_) => SegmentRepository::transcript(&conn, id).map(Some),
            None => Ok(None),
        }
    })
    .await
    .map_err(|_| ApiError::internal("database task failed"))??
    .ok_or_else(|| ApiError::not_found("no such meeting"))?;

    if transcript.is_empty() {
        return Err(ApiError::bad_request("meeting has no transcript"));
    }

    let summary = summary_service.generate_summary(&transcript).await?;

    let stored = summary.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        MeetingRepository::set_summary(&conn, id, &stored)
    })
    .await
    .map_err(|_| ApiError::internal("database task failed"))??;

    info!("Regenerated summary for meeting {id}");
    Ok(Json(json!({ "summary": summary })))
}

async fn action_items(
    Path(id): Path<i64>,
    State(state): State<MeetingsState>,
) -> ApiResult<Json<Value>> {
    let summary_service = state
        .summary
        .ok_or_else(|| ApiError::bad_request("no summarization backend configured"))?;

    let transcript = tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        match MeetingRepository::get(&conn, id)? {
            Some(_) => SegmentRepository::transcript(&conn, id).map(Some),
            None => Ok(None),
        }
    })
    .await
    .map_err(|_| ApiError::internal("database task failed"))??
    .ok_or_else(|| ApiError::not_found("no such meeting"))?;

    let items = summary_service.generate_action_items(&transcript).await;
    Ok(Json(json!({ "action_items": items })))
}
