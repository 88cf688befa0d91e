use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{courses, modules};

use super::courses::parse_course_id;

fn parse_module_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid module id"))
}

#[derive(Debug, Deserialize)]
pub struct CreateModuleRequest {
    #[serde(default)]
    pub title: String,
    pub position: Option<i32>,
}

/// POST /courses/:course_id/modules
pub async fn create(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(body): Json<CreateModuleRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let course_id = parse_course_id(&course_id)?;
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    if courses::get_by_id(&state.pool, course_id).await?.is_none() {
        return Err(ApiError::not_found("Course not found"));
    }

    let module = modules::create(&state.pool, course_id, body.title.trim(), body.position).await?;
    Ok((StatusCode::CREATED, Json(json!({ "module": module }))))
}

/// GET /courses/:course_id/modules
pub async fn list(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let course_id = parse_course_id(&course_id)?;
    let items = modules::list_by_course(&state.pool, course_id).await?;
    Ok(Json(json!({ "modules": items })))
}

/// PUT /modules/:module_id
pub async fn update(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let module_id = parse_module_id(&module_id)?;
    let module = modules::update_fields(&state.pool, module_id, &fields)
        .await??
        .ok_or_else(|| ApiError::not_found("Module not found"))?;
    Ok(Json(json!({ "module": module })))
}

/// DELETE /modules/:module_id
pub async fn delete(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let module_id = parse_module_id(&module_id)?;
    if !modules::delete(&state.pool, module_id).await? {
        return Err(ApiError::not_found("Module not found"));
    }
    Ok(Json(json!({ "message": "Module deleted" })))
}
