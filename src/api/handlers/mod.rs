//! REST endpoint handlers organized by resource.

pub mod auth;
pub mod dispenser;
pub mod statistics;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes mounted under `/api`.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(dispenser::routes(state))
        .merge(statistics::routes(state))
}
