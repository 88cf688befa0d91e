use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::db::page::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{courses, lessons, modules};

const STATUSES: &[&str] = &["DRAFT", "PUBLISHED", "ARCHIVED"];

pub fn parse_course_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid course id"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: Option<String>,
}

/// POST /courses
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    let status = body
        .status
        .map(|s| s.to_uppercase())
        .unwrap_or_else(|| "DRAFT".to_string());
    if !STATUSES.contains(&status.as_str()) {
        return Err(ApiError::bad_request(
            "Status must be one of: DRAFT, PUBLISHED, ARCHIVED",
        ));
    }

    let course = courses::create(
        &state.pool,
        body.title.trim(),
        body.description.as_deref(),
        body.thumbnail_url.as_deref(),
        &status,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "course": course }))))
}

/// GET /courses/:course_id
///
/// Detail view: the course with its modules, each module carrying its lessons
/// in position order.
pub async fn get(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let course_id = parse_course_id(&course_id)?;
    let course = courses::get_by_id(&state.pool, course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    let module_rows = modules::list_by_course(&state.pool, course_id).await?;
    let lesson_rows = lessons::list_by_course(&state.pool, course_id).await?;

    let modules_json: Vec<Value> = module_rows
        .iter()
        .map(|m| {
            let lessons_json: Vec<&lessons::Lesson> = lesson_rows
                .iter()
                .filter(|l| l.module_id == m.module_id)
                .collect();
            json!({
                "module_id": m.module_id,
                "course_id": m.course_id,
                "title": m.title,
                "position": m.position,
                "created_at": m.created_at,
                "updated_at": m.updated_at,
                "lessons": lessons_json,
            })
        })
        .collect();

    Ok(Json(json!({
        "course": course,
        "modules": modules_json,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListCoursesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
}

/// GET /courses
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListCoursesQuery>,
) -> Result<Json<Value>, ApiError> {
    let (limit, offset) = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .normalize()?;
    let page = courses::list(
        &state.pool,
        limit,
        offset,
        query.search.as_deref(),
        query.status.as_deref().map(|s| s.to_uppercase()).as_deref(),
    )
    .await?;

    Ok(Json(json!({
        "courses": page.items,
        "pagination": page.meta,
    })))
}

/// PUT /courses/:course_id
pub async fn update(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(mut fields): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let course_id = parse_course_id(&course_id)?;

    if let Some(status) = fields.get("status").and_then(Value::as_str) {
        let upper = status.to_uppercase();
        if !STATUSES.contains(&upper.as_str()) {
            return Err(ApiError::bad_request(
                "Status must be one of: DRAFT, PUBLISHED, ARCHIVED",
            ));
        }
        fields.insert("status".to_string(), Value::String(upper));
    }

    let course = courses::update_fields(&state.pool, course_id, &fields)
        .await??
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    Ok(Json(json!({ "course": course })))
}

/// DELETE /courses/:course_id
pub async fn delete(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let course_id = parse_course_id(&course_id)?;
    if !courses::delete(&state.pool, course_id).await? {
        return Err(ApiError::not_found("Course not found"));
    }
    Ok(Json(json!({ "message": "Course deleted" })))
}
