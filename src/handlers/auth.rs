use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{create_token, Claims};
use crate::error::ApiError;
use crate::mailer::templates::EmailType;
use crate::mailer::worker::change_record;
use crate::state::AppState;
use crate::store::users;

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// POST /signin
pub async fn signin(
    State(state): State<AppState>,
    Json(body): Json<SigninRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let user = users::get_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let verified = bcrypt::verify(&body.password, &user.password_hash).map_err(|e| {
        tracing::error!("password verification failed: {}", e);
        ApiError::Internal
    })?;
    if !verified {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let claims = Claims::new(user.user_id.clone(), user.email.clone(), user.role.clone());
    let token = create_token(&claims)?;

    Ok(Json(json!({
        "token": token,
        "email": user.email,
        "role": user.role,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// POST /forgot-password
///
/// The response does not reveal whether the account exists; the temporary
/// password is only emailed when it does.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }

    if let Some(password) = users::reset_password(&state.pool, &email).await? {
        state.queue_email(change_record(
            EmailType::ForgotPassword,
            &[email.clone()],
            json!({ "email": email, "temp_password": password }),
        ));
    }

    Ok(Json(json!({
        "message": "If the account exists, a temporary password has been sent"
    })))
}
