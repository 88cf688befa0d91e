use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::page::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::enrollments;

use super::batches::parse_batch_id;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[serde(default)]
    pub student_id: String,
}

/// POST /batches/:batch_id/students
pub async fn enroll(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Json(body): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let batch_id = parse_batch_id(&batch_id)?;
    if body.student_id.trim().is_empty() {
        return Err(ApiError::bad_request("Student id is required"));
    }

    if !enrollments::batch_exists(&state.pool, batch_id).await? {
        return Err(ApiError::not_found("Batch not found"));
    }

    // Duplicate enrollment surfaces as a unique violation from the insert,
    // never an app-level pre-check.
    let enrollment = enrollments::enroll(&state.pool, batch_id, body.student_id.trim())
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                ApiError::conflict("Student already enrolled in this batch")
            } else {
                e.into()
            }
        })?;

    Ok((StatusCode::CREATED, Json(json!({ "enrollment": enrollment }))))
}

#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
}

/// GET /batches/:batch_id/students
pub async fn roster(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<Value>, ApiError> {
    let batch_id = parse_batch_id(&batch_id)?;
    if !enrollments::batch_exists(&state.pool, batch_id).await? {
        return Err(ApiError::not_found("Batch not found"));
    }

    let (limit, offset) = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .normalize()?;
    let page =
        enrollments::list_batch_students(&state.pool, batch_id, limit, offset, query.search.as_deref())
            .await?;

    Ok(Json(json!({
        "students": page.items,
        "pagination": page.meta,
    })))
}

/// DELETE /batches/:batch_id/students/:student_id
pub async fn unenroll(
    State(state): State<AppState>,
    Path((batch_id, student_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let batch_id = parse_batch_id(&batch_id)?;
    if !enrollments::unenroll(&state.pool, batch_id, &student_id).await? {
        return Err(ApiError::not_found("Enrollment not found"));
    }
    Ok(Json(json!({ "message": "Student removed from batch" })))
}
