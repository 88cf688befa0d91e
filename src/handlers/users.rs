use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::db::page::PageQuery;
use crate::error::ApiError;
use crate::mailer::templates::EmailType;
use crate::mailer::worker::change_record;
use crate::state::AppState;
use crate::store::users;

const ROLES: &[&str] = &["admin", "user", "teacher", "student"];
const STATUSES: &[&str] = &["Active", "Inactive"];

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub role: Option<String>,
    pub status: Option<String>,
}

/// POST /users
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }

    let role = body.role.unwrap_or_else(|| "user".to_string());
    if !ROLES.contains(&role.as_str()) {
        return Err(ApiError::bad_request(
            "Role must be one of: admin, user, teacher, student",
        ));
    }
    let status = body.status.unwrap_or_else(|| "Active".to_string());
    if !STATUSES.contains(&status.as_str()) {
        return Err(ApiError::bad_request("Status must be Active or Inactive"));
    }

    let created = users::create(&state.pool, &email, &body.full_name, &role, &status)
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                ApiError::conflict("User already exists")
            } else {
                e.into()
            }
        })?;

    state.queue_email(change_record(
        EmailType::PasswordEmail,
        &[created.email.clone()],
        json!({ "user_email": created.email, "password": created.password }),
    ));

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user_id": created.user_id,
            "email": created.email,
            "role": role,
            "status": status,
        })),
    ))
}

// limit/offset are declared inline rather than flattened; flattening breaks
// numeric parsing under the query-string deserializer.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
}

/// GET /users
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Value>, ApiError> {
    let (limit, offset) = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .normalize()?;
    let page = users::list(&state.pool, limit, offset, query.search.as_deref()).await?;

    Ok(Json(json!({
        "users": page.items,
        "pagination": page.meta,
    })))
}

/// PUT /users/:user_id  [admin]
pub async fn update(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    if let Some(role) = fields.get("role").and_then(Value::as_str) {
        if !ROLES.contains(&role) {
            return Err(ApiError::bad_request(
                "Role must be one of: admin, user, teacher, student",
            ));
        }
    }
    if let Some(status) = fields.get("status").and_then(Value::as_str) {
        if !STATUSES.contains(&status) {
            return Err(ApiError::bad_request("Status must be Active or Inactive"));
        }
    }

    let user = users::update_fields(&state.pool, &user_id, &fields)
        .await??
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({ "user": user })))
}

/// DELETE /users/:user_id  [admin]
///
/// The path value may be a user id or an email, matching the delete contract.
pub async fn delete(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !users::delete(&state.pool, &user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(Json(json!({ "message": "User deleted" })))
}
