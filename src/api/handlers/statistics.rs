//! Statistics handlers (admin only).

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::DispenserStatsResponse;
use crate::app_state::AppState;
use crate::auth::require_admin;
use crate::domain::DispenserId;
use crate::error::DispenserError;

/// `GET /statistics/{id}`: Usage totals and per-session breakdown of one
/// dispenser.
///
/// # Errors
///
/// Returns [`DispenserError::DispenserNotFound`] if the id is unknown.
pub async fn dispenser_statistics(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DispenserStatsResponse>, DispenserError> {
    let Path(id) = id?;
    let stats = state
        .dispenser_service
        .dispenser_stats(DispenserId::new(id))
        .await?;
    Ok(Json(DispenserStatsResponse::from(stats)))
}

/// `GET /statistics`: Statistics of every dispenser.
///
/// # Errors
///
/// Returns [`DispenserError::Internal`] if a projected charge cannot be
/// represented.
pub async fn all_statistics(
    State(state): State<AppState>,
) -> Result<Json<Vec<DispenserStatsResponse>>, DispenserError> {
    let stats = state.dispenser_service.all_stats().await?;
    Ok(Json(stats.into_iter().map(DispenserStatsResponse::from).collect()))
}

/// Statistics routes, all behind the admin guard.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/statistics", get(all_statistics))
        .route("/statistics/{id}", get(dispenser_statistics))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}
