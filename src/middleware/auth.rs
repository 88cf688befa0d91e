use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

use crate::auth;
use crate::error::ApiError;

/// Gate for admin-only routes. Injects the verified `Principal` into request
/// extensions for the downstream handler.
pub async fn require_admin(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = auth::authorize(&headers, &["admin"])?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Gate for routes open to staff (admin or teacher).
pub async fn require_staff(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = auth::authorize(&headers, &["admin", "teacher"])?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
