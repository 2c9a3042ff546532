//! # dispenser-gateway
//!
//! REST API for metered beverage dispensers.
//!
//! Administrators register dispensers with a flow rate and a unit price.
//! Anyone may open and close a dispenser; each open-to-close session is
//! billed as `elapsed_seconds * flow_volume * price`. Administrators can
//! read per-dispenser and global usage statistics, including live
//! projections for sessions still in progress.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)  ── admin guard (auth/)
//!     │
//!     ├── DispenserService, AuthService (service/)
//!     │
//!     ├── DispenserRegistry (domain/)
//!     │
//!     └── DispenserStore: in-memory or PostgreSQL (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the fully layered application router, ready to serve.
pub fn app(state: AppState) -> Router {
    api::build_router(&state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
