use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    /// Original filename, kept only for its extension.
    pub file_name: Option<String>,
}

/// POST /assets/upload-url  [admin, teacher]
///
/// Returns a server-generated object key and a time-limited URL the client
/// uploads to directly.
pub async fn upload_url(
    State(state): State<AppState>,
    Json(body): Json<UploadUrlRequest>,
) -> Result<Json<Value>, ApiError> {
    let extension = body
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| format!(".{ext}"))
        .unwrap_or_default();
    let key = format!("uploads/{}{}", Uuid::new_v4(), extension);

    let ttl_secs = config::config().assets.upload_ttl_secs;
    let url = state
        .assets
        .upload_url(&key, Duration::from_secs(ttl_secs))
        .await
        .map_err(|e| {
            tracing::error!("presigning failed: {}", e);
            ApiError::Internal
        })?;

    Ok(Json(json!({
        "key": key,
        "url": url,
        "expiresIn": ttl_secs,
    })))
}
