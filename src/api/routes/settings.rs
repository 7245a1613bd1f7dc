//! Host shell preference endpoints (GET /settings, PUT /settings).

use axum::{
    response::Json,
    routing::{get, put},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::api::error::{ApiError, ApiResult};
use crate::db::{self, SettingsRepository};

pub fn router() -> Router {
    Router::new()
        .route("/settings", get(get_settings))
        .route("/settings", put(update_settings))
}

async fn get_settings() -> ApiResult<Json<Value>> {
    let settings = tokio::task::spawn_blocking(|| {
        let conn = db::init_db()?;
        SettingsRepository::all(&conn)
    })
    .await
    .map_err(|_| ApiError::internal("database task failed"))??;

    Ok(Json(json!({ "settings": settings })))
}

async fn update_settings(
    Json(updates): Json<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let updated = updates.len();
    tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        for (key, value) in &updates {
            SettingsRepository::set(&conn, key, value)?;
        }
        anyhow::Ok(())
    })
    .await
    .map_err(|_| ApiError::internal("database task failed"))??;

    Ok(Json(json!({ "updated": updated })))
}
