//! Dispenser DTOs for registration, lookup, and open/close.

use serde::{Deserialize, Serialize};

use crate::domain::{Charge, Dispenser, DispenserId};

/// Request body for `POST /api/dispenser`.
///
/// Both fields are optional at the serde level so a missing one can be
/// reported with a single domain message instead of a serde error.
#[derive(Debug, Deserialize)]
pub struct CreateDispenserRequest {
    /// Units dispensed per second.
    #[serde(default)]
    pub flow_volume: Option<f64>,
    /// Price per unit.
    #[serde(default)]
    pub price: Option<f64>,
}

/// Response body for `POST /api/dispenser` (201 Created).
#[derive(Debug, Serialize)]
pub struct CreateDispenserResponse {
    /// Assigned identifier.
    pub id: DispenserId,
    /// Units dispensed per second.
    pub flow_volume: f64,
    /// Price per unit.
    pub price: f64,
}

impl From<Dispenser> for CreateDispenserResponse {
    fn from(d: Dispenser) -> Self {
        Self {
            id: d.id,
            flow_volume: d.flow_volume,
            price: d.price,
        }
    }
}

/// A dispenser as returned by `GET /api/dispenser[/{id}]`.
#[derive(Debug, Serialize)]
pub struct DispenserResponse {
    /// Identifier.
    pub id: DispenserId,
    /// Units dispensed per second.
    pub flow_volume: f64,
    /// Price per unit.
    pub price: f64,
    /// Whether a session is in progress.
    pub is_open: bool,
}

impl From<Dispenser> for DispenserResponse {
    fn from(d: Dispenser) -> Self {
        Self {
            id: d.id,
            flow_volume: d.flow_volume,
            price: d.price,
            is_open: d.is_open,
        }
    }
}

/// Response body for `POST /api/dispenser/{id}/close`.
#[derive(Debug, Serialize)]
pub struct CloseDispenserResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Units dispensed during the session.
    pub amount: f64,
    /// Revenue of the session.
    pub cost: f64,
}

impl CloseDispenserResponse {
    /// Builds the close acknowledgement from the final charge.
    #[must_use]
    pub fn new(charge: Charge) -> Self {
        Self {
            message: "Dispenser closed successfully".to_string(),
            amount: charge.amount,
            cost: charge.revenue,
        }
    }
}
