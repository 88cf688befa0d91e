use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::lessons::{self, Lesson};
use crate::store::modules;

fn parse_module_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid module id"))
}

fn parse_lesson_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid lesson id"))
}

/// Attach a presigned download URL when the lesson has a stored video.
/// Presigning failures degrade to a null URL rather than failing the read.
async fn with_video_url(state: &AppState, lesson: &Lesson) -> Value {
    let video_url = match &lesson.video_key {
        Some(key) => {
            let ttl = Duration::from_secs(config::config().assets.download_ttl_secs);
            match state.assets.download_url(key, ttl).await {
                Ok(url) => Value::String(url),
                Err(e) => {
                    tracing::warn!(lesson_id = %lesson.lesson_id, error = %e, "presigning failed");
                    Value::Null
                }
            }
        }
        None => Value::Null,
    };

    json!({
        "lesson_id": lesson.lesson_id,
        "module_id": lesson.module_id,
        "title": lesson.title,
        "video_key": lesson.video_key,
        "video_url": video_url,
        "duration_minutes": lesson.duration_minutes,
        "position": lesson.position,
        "created_at": lesson.created_at,
        "updated_at": lesson.updated_at,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonRequest {
    #[serde(default)]
    pub title: String,
    pub video_key: Option<String>,
    pub duration_minutes: Option<i32>,
    pub position: Option<i32>,
}

/// POST /modules/:module_id/lessons
pub async fn create(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
    Json(body): Json<CreateLessonRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let module_id = parse_module_id(&module_id)?;
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    if modules::get_by_id(&state.pool, module_id).await?.is_none() {
        return Err(ApiError::not_found("Module not found"));
    }

    let lesson = lessons::create(
        &state.pool,
        module_id,
        body.title.trim(),
        body.video_key.as_deref(),
        body.duration_minutes,
        body.position,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "lesson": lesson }))))
}

/// GET /modules/:module_id/lessons
pub async fn list(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let module_id = parse_module_id(&module_id)?;
    let rows = lessons::list_by_module(&state.pool, module_id).await?;

    let mut items = Vec::with_capacity(rows.len());
    for lesson in &rows {
        items.push(with_video_url(&state, lesson).await);
    }

    Ok(Json(json!({ "lessons": items })))
}

/// PUT /lessons/:lesson_id
pub async fn update(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let lesson_id = parse_lesson_id(&lesson_id)?;
    let lesson = lessons::update_fields(&state.pool, lesson_id, &fields)
        .await??
        .ok_or_else(|| ApiError::not_found("Lesson not found"))?;
    Ok(Json(json!({ "lesson": lesson })))
}

/// DELETE /lessons/:lesson_id
pub async fn delete(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let lesson_id = parse_lesson_id(&lesson_id)?;
    if !lessons::delete(&state.pool, lesson_id).await? {
        return Err(ApiError::not_found("Lesson not found"));
    }
    Ok(Json(json!({ "message": "Lesson deleted" })))
}
