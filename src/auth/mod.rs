use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::ApiError;

/// Token claims carried by every bearer token. Expiry is 24h from issuance
/// (configurable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: String, email: String, role: String) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self {
            sub: user_id,
            email,
            role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(expiry_hours)).timestamp(),
        }
    }
}

/// Authenticated caller identity, as decoded from a verified token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

pub fn create_token(claims: &Claims) -> Result<String, ApiError> {
    let secret = &config::config().security.jwt_secret;
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &key).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::Internal
    })
}

fn verify_token(token: &str) -> Option<Claims> {
    let secret = &config::config().security.jwt_secret;
    let key = DecodingKey::from_secret(secret.as_bytes());
    // Default validation checks HS256 signature and exp; expired and malformed
    // tokens are deliberately indistinguishable in the response.
    decode::<Claims>(token, &key, &Validation::default())
        .ok()
        .map(|data| data.claims)
}

/// Authorize a request from its headers. Pure function of the headers, the
/// allowed-role list and the verification key.
///
/// Missing/malformed bearer scheme -> 401 "Unauthorized"; verification
/// failure -> 401 "Invalid token"; role not in a non-empty `allowed_roles` ->
/// 403 "Forbidden".
pub fn authorize(headers: &HeaderMap, allowed_roles: &[&str]) -> Result<Principal, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let claims = verify_token(&token).ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

    if !allowed_roles.is_empty() && !allowed_roles.contains(&claims.role.as_str()) {
        return Err(ApiError::forbidden("Forbidden"));
    }

    Ok(claims.into())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    // HeaderMap lookups are case-insensitive by construction
    let auth = headers.get("authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn round_trip_token_authorizes() {
        let claims = Claims::new("US12345".into(), "a@b.c".into(), "admin".into());
        let token = create_token(&claims).unwrap();

        let principal = authorize(&headers_with(&token), &[]).unwrap();
        assert_eq!(principal.user_id, "US12345");
        assert_eq!(principal.role, "admin");
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let err = authorize(&HeaderMap::new(), &[]).unwrap_err();
        assert_eq!(err.message(), "Unauthorized");
    }

    #[test]
    fn malformed_scheme_is_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        let err = authorize(&headers, &[]).unwrap_err();
        assert_eq!(err.message(), "Unauthorized");
    }

    #[test]
    fn wrong_key_token_is_invalid() {
        let claims = Claims::new("US1".into(), "a@b.c".into(), "admin".into());
        let key = EncodingKey::from_secret(b"some-other-secret");
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let err = authorize(&headers_with(&token), &[]).unwrap_err();
        assert_eq!(err.message(), "Invalid token");
    }

    #[test]
    fn expired_token_is_invalid() {
        let now = Utc::now();
        let claims = Claims {
            sub: "US1".into(),
            email: "a@b.c".into(),
            role: "admin".into(),
            iat: (now - Duration::hours(48)).timestamp(),
            exp: (now - Duration::hours(24)).timestamp(),
        };
        let token = create_token(&claims).unwrap();

        let err = authorize(&headers_with(&token), &[]).unwrap_err();
        assert_eq!(err.message(), "Invalid token");
    }

    #[test]
    fn disallowed_role_is_forbidden() {
        let claims = Claims::new("US1".into(), "a@b.c".into(), "student".into());
        let token = create_token(&claims).unwrap();

        let err = authorize(&headers_with(&token), &["admin"]).unwrap_err();
        assert_eq!(err.message(), "Forbidden");
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn empty_role_list_skips_role_check() {
        let claims = Claims::new("US1".into(), "a@b.c".into(), "student".into());
        let token = create_token(&claims).unwrap();
        assert!(authorize(&headers_with(&token), &[]).is_ok());
    }
}
