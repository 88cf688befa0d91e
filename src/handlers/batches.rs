use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::db::page::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::batches::{self, NewBatch};
use crate::store::courses;

use super::courses::parse_course_id;

pub fn parse_batch_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid batch id"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    #[serde(default)]
    pub batch_name: String,
    #[serde(default)]
    pub batch_code: String,
    #[serde(default)]
    pub start_date: String,
    pub end_date: Option<String>,
    pub schedule_type: Option<String>,
    pub days_of_week: Option<Vec<String>>,
    pub time_slot: Option<String>,
    pub instructor_id: Option<String>,
    pub max_capacity: Option<i32>,
    pub status: Option<String>,
}

/// POST /courses/:course_id/batches
pub async fn create(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(body): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let course_id = parse_course_id(&course_id)?;
    if body.batch_name.trim().is_empty()
        || body.batch_code.trim().is_empty()
        || body.start_date.trim().is_empty()
    {
        return Err(ApiError::bad_request(
            "Batch name, batch code, and start date are required",
        ));
    }

    if courses::get_by_id(&state.pool, course_id).await?.is_none() {
        return Err(ApiError::not_found("Course not found"));
    }

    let new = NewBatch {
        batch_name: body.batch_name.trim().to_string(),
        batch_code: body.batch_code.trim().to_string(),
        start_date: body.start_date,
        end_date: body.end_date,
        schedule_type: body.schedule_type.unwrap_or_else(|| "weekday".to_string()),
        days_of_week: body.days_of_week,
        time_slot: body.time_slot,
        instructor_id: body.instructor_id,
        max_capacity: body.max_capacity.unwrap_or(30),
        status: body.status.unwrap_or_else(|| "upcoming".to_string()),
    };

    let batch = batches::create(&state.pool, course_id, &new)
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                ApiError::conflict("Batch code already exists")
            } else {
                e.into()
            }
        })?;

    Ok((StatusCode::CREATED, Json(json!({ "batch": batch }))))
}

/// GET /courses/:course_id/batches/:batch_id
pub async fn get(
    State(state): State<AppState>,
    Path((course_id, batch_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let course_id = parse_course_id(&course_id)?;
    let batch_id = parse_batch_id(&batch_id)?;
    let batch = batches::get_by_id(&state.pool, course_id, batch_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Batch not found"))?;
    Ok(Json(json!({ "batch": batch })))
}

/// GET /courses/:course_id/batches
pub async fn list_by_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let course_id = parse_course_id(&course_id)?;
    let items = batches::list_by_course(&state.pool, course_id).await?;
    Ok(Json(json!({ "batches": items })))
}

#[derive(Debug, Deserialize)]
pub struct ListBatchesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    #[serde(rename = "courseId")]
    pub course_id: Option<String>,
    pub status: Option<String>,
}

/// GET /batches
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<ListBatchesQuery>,
) -> Result<Json<Value>, ApiError> {
    let (limit, offset) = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .normalize()?;
    let course_id = match &query.course_id {
        Some(raw) => Some(parse_course_id(raw)?),
        None => None,
    };

    let page = batches::list_all(
        &state.pool,
        limit,
        offset,
        query.search.as_deref(),
        course_id,
        query.status.as_deref(),
    )
    .await?;

    Ok(Json(json!({
        "batches": page.items,
        "pagination": page.meta,
    })))
}

/// PUT /courses/:course_id/batches/:batch_id
pub async fn update(
    State(state): State<AppState>,
    Path((course_id, batch_id)): Path<(String, String)>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let course_id = parse_course_id(&course_id)?;
    let batch_id = parse_batch_id(&batch_id)?;

    let batch = batches::update_fields(&state.pool, course_id, batch_id, &fields)
        .await??
        .ok_or_else(|| ApiError::not_found("Batch not found"))?;

    Ok(Json(json!({ "batch": batch })))
}

/// DELETE /batches/:batch_id
pub async fn delete(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let batch_id = parse_batch_id(&batch_id)?;
    if !batches::delete(&state.pool, batch_id).await? {
        return Err(ApiError::not_found("Batch not found"));
    }
    Ok(Json(json!({ "message": "Batch deleted" })))
}
