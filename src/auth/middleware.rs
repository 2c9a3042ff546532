//! Bearer-token guard for admin-only routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::app_state::AppState;
use crate::error::DispenserError;

fn bearer_token(request: &Request) -> Result<&str, DispenserError> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| DispenserError::Unauthorized("Missing Authorization Header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            let message = "Authorization header must be 'Bearer <token>'";
            DispenserError::Unauthorized(message.to_string())
        })
}

/// Rejects requests without a valid admin access token.
///
/// On success the verified [`super::AdminIdentity`] is stored in the
/// request extensions for downstream handlers.
///
/// # Errors
///
/// Returns [`DispenserError::Unauthorized`] if the header is missing,
/// malformed, or carries an invalid token.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, DispenserError> {
    let identity = state.auth_service.authenticate(bearer_token(&request)?)?;
    tracing::debug!(admin_id = identity.admin_id, "admin authenticated");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
