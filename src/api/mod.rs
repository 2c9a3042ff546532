//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Dispenser and statistics endpoints are mounted under `/api`, login
//! under `/auth`, and the health check at the root.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
///
/// Unknown paths fall through to a JSON 404.
pub fn build_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/api", handlers::routes(state))
        .nest("/auth", handlers::auth::routes())
        .merge(handlers::system::routes())
        .fallback(handlers::system::not_found_handler)
}
