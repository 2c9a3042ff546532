//! Dispenser configuration and open/closed state.

use serde::Serialize;

use super::DispenserId;
use crate::error::DispenserError;

/// Largest accepted flow rate or unit price.
pub const MAX_RATE: f64 = 1_000_000.0;

/// Validated flow rate and unit price of a dispenser.
///
/// Both values must be finite, strictly positive and at most
/// [`MAX_RATE`], which keeps `elapsed * flow_volume * price` finite for any
/// realistic session length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispenserRates {
    flow_volume: f64,
    price: f64,
}

fn in_range(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= MAX_RATE
}

impl DispenserRates {
    /// Validates and wraps a flow rate (units/second) and unit price.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::InvalidRequest`] if either value is not
    /// a finite number in `(0, MAX_RATE]`.
    pub fn new(flow_volume: f64, price: f64) -> Result<Self, DispenserError> {
        if !in_range(flow_volume) {
            return Err(DispenserError::InvalidRequest(format!(
                "Flow volume must be a positive number up to {MAX_RATE}"
            )));
        }
        if !in_range(price) {
            return Err(DispenserError::InvalidRequest(format!(
                "Price must be a positive number up to {MAX_RATE}"
            )));
        }
        Ok(Self { flow_volume, price })
    }

    /// Units dispensed per second.
    #[must_use]
    pub const fn flow_volume(&self) -> f64 {
        self.flow_volume
    }

    /// Price per unit dispensed.
    #[must_use]
    pub const fn price(&self) -> f64 {
        self.price
    }
}

/// A registered dispenser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispenser {
    /// Store-assigned identifier.
    pub id: DispenserId,
    /// Units dispensed per second while open.
    pub flow_volume: f64,
    /// Price per unit.
    pub price: f64,
    /// Whether a usage session is currently in progress.
    pub is_open: bool,
}

impl Dispenser {
    /// Creates a closed dispenser from validated rates.
    #[must_use]
    pub const fn new(id: DispenserId, rates: DispenserRates) -> Self {
        Self {
            id,
            flow_volume: rates.flow_volume(),
            price: rates.price(),
            is_open: false,
        }
    }
}
