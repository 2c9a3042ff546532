//! Dispenser handlers: register, list, get, open, close.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CloseDispenserResponse, CreateDispenserRequest, CreateDispenserResponse, DispenserResponse,
    MessageResponse,
};
use crate::app_state::AppState;
use crate::auth::require_admin;
use crate::domain::DispenserId;
use crate::error::DispenserError;

/// `POST /dispenser`: Register a new dispenser (admin only).
///
/// # Errors
///
/// Returns [`DispenserError::InvalidRequest`] if a field is missing or not
/// a positive number.
pub async fn create_dispenser(
    State(state): State<AppState>,
    payload: Result<Json<CreateDispenserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, DispenserError> {
    let Json(req) = payload?;
    let (Some(flow_volume), Some(price)) = (req.flow_volume, req.price) else {
        return Err(DispenserError::InvalidRequest(
            "Flow volume and price are required".to_string(),
        ));
    };

    let dispenser = state
        .dispenser_service
        .register(flow_volume, price)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateDispenserResponse::from(dispenser)),
    ))
}

/// `GET /dispenser`: List all dispensers in creation order.
pub async fn list_dispensers(State(state): State<AppState>) -> Json<Vec<DispenserResponse>> {
    let dispensers = state.dispenser_service.list().await;
    Json(dispensers.into_iter().map(DispenserResponse::from).collect())
}

/// `GET /dispenser/{id}`: Get one dispenser.
///
/// # Errors
///
/// Returns [`DispenserError::DispenserNotFound`] if the id is unknown.
pub async fn get_dispenser(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DispenserResponse>, DispenserError> {
    let Path(id) = id?;
    let dispenser = state.dispenser_service.get(DispenserId::new(id)).await?;
    Ok(Json(DispenserResponse::from(dispenser)))
}

/// `POST /dispenser/{id}/open`: Start a usage session.
///
/// # Errors
///
/// Returns [`DispenserError::DispenserNotFound`] or
/// [`DispenserError::AlreadyOpen`].
pub async fn open_dispenser(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, DispenserError> {
    let Path(id) = id?;
    state.dispenser_service.open(DispenserId::new(id)).await?;
    Ok(Json(MessageResponse::new("Dispenser opened successfully")))
}

/// `POST /dispenser/{id}/close`: End the usage session and bill it.
///
/// # Errors
///
/// Returns [`DispenserError::DispenserNotFound`],
/// [`DispenserError::AlreadyClosed`] or
/// [`DispenserError::InternalInconsistency`].
pub async fn close_dispenser(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<CloseDispenserResponse>, DispenserError> {
    let Path(id) = id?;
    let charge = state.dispenser_service.close(DispenserId::new(id)).await?;
    Ok(Json(CloseDispenserResponse::new(charge)))
}

/// Dispenser routes; registration requires an admin token.
pub fn routes(state: &AppState) -> Router<AppState> {
    let admin = middleware::from_fn_with_state(state.clone(), require_admin);
    Router::new()
        .route(
            "/dispenser",
            get(list_dispensers).merge(post(create_dispenser).route_layer(admin)),
        )
        .route("/dispenser/{id}", get(get_dispenser))
        .route("/dispenser/{id}/open", post(open_dispenser))
        .route("/dispenser/{id}/close", post(close_dispenser))
}
