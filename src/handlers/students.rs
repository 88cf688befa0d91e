use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::db::page::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::students::{self, NewStudent};

const CURRENT_STATUSES: &[&str] = &["Student", "Working Professional", "Freelancer", "Unemployed"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile_number: String,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub profile_photo_url: Option<String>,
    pub emergency_contact: Option<String>,
    pub residential_address: Option<String>,
    pub current_status: Option<String>,
    pub highest_qualification: Option<String>,
    pub id_proof_type: Option<String>,
    pub id_number: Option<String>,
    pub lead_source: Option<String>,
}

/// POST /students
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = body.email.trim().to_lowercase();
    if body.first_name.trim().is_empty()
        || body.last_name.trim().is_empty()
        || email.is_empty()
        || body.mobile_number.trim().is_empty()
    {
        return Err(ApiError::bad_request(
            "First name, last name, email, and mobile number are required",
        ));
    }

    let current_status = body.current_status.unwrap_or_else(|| "Student".to_string());
    if !CURRENT_STATUSES.contains(&current_status.as_str()) {
        return Err(ApiError::bad_request(
            "Current status must be one of: Student, Working Professional, Freelancer, Unemployed",
        ));
    }

    let new = NewStudent {
        first_name: body.first_name.trim().to_string(),
        last_name: body.last_name.trim().to_string(),
        email,
        mobile_number: body.mobile_number.trim().to_string(),
        date_of_birth: body.date_of_birth,
        gender: body.gender,
        profile_photo_url: body.profile_photo_url,
        emergency_contact: body.emergency_contact,
        residential_address: body.residential_address,
        current_status,
        highest_qualification: body.highest_qualification,
        id_proof_type: body.id_proof_type.unwrap_or_else(|| "Aadhaar_Card".to_string()),
        id_number: body.id_number,
        lead_source: body.lead_source.unwrap_or_else(|| "Instagram_Ad".to_string()),
    };

    let student = students::create(&state.pool, &new).await.map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ApiError::conflict("Student with this email already exists")
        } else {
            e.into()
        }
    })?;

    Ok((StatusCode::CREATED, Json(json!({ "student": student }))))
}

/// GET /students/:student_id
pub async fn get(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let student = students::get_by_id(&state.pool, &student_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;
    Ok(Json(json!({ "student": student })))
}

#[derive(Debug, Deserialize)]
pub struct ListStudentsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    #[serde(rename = "currentStatus")]
    pub current_status: Option<String>,
}

/// GET /students
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListStudentsQuery>,
) -> Result<Json<Value>, ApiError> {
    let (limit, offset) = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .normalize()?;
    let page = students::list(
        &state.pool,
        limit,
        offset,
        query.search.as_deref(),
        query.current_status.as_deref(),
    )
    .await?;

    Ok(Json(json!({
        "students": page.items,
        "pagination": page.meta,
    })))
}

/// PUT /students/:student_id
pub async fn update(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    if let Some(status) = fields.get("currentStatus").and_then(Value::as_str) {
        if !CURRENT_STATUSES.contains(&status) {
            return Err(ApiError::bad_request(
                "Current status must be one of: Student, Working Professional, Freelancer, Unemployed",
            ));
        }
    }

    let student = students::update_fields(&state.pool, &student_id, &fields)
        .await??
        .ok_or_else(|| ApiError::not_found("Student not found"))?;

    Ok(Json(json!({ "student": student })))
}

/// DELETE /students/:student_id
pub async fn delete(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !students::delete(&state.pool, &student_id).await? {
        return Err(ApiError::not_found("Student not found"));
    }
    Ok(Json(json!({ "message": "Student deleted" })))
}
