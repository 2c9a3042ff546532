//! Login handler.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{LoginRequest, LoginResponse};
use crate::app_state::AppState;
use crate::error::DispenserError;

/// `POST /login`: Exchange admin credentials for an access token.
///
/// # Errors
///
/// Returns [`DispenserError::InvalidRequest`] on a malformed body and
/// [`DispenserError::Unauthorized`] on bad credentials.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, DispenserError> {
    let Json(req) = payload?;
    let access_token = state
        .auth_service
        .login(&req.username, &req.password)
        .await?;
    Ok(Json(LoginResponse { access_token }))
}

/// Auth routes, mounted under `/auth`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}
