//! Billing arithmetic: elapsed open time to amount dispensed and revenue.

use std::iter::Sum;
use std::ops::Add;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::DispenserError;

/// Quantity dispensed and money owed for one usage session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Charge {
    /// Units dispensed (`elapsed_seconds * flow_volume`).
    pub amount: f64,
    /// Money owed (`amount * price`).
    pub revenue: f64,
}

impl Charge {
    /// Computes the charge for a session that ran from `start` to `end`
    /// at the given flow rate and unit price.
    ///
    /// The rates are whatever the dispenser carries at computation time,
    /// so a rate change while a session is open applies to the whole
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::Internal`] if the amount or revenue is not
    /// a finite number.
    pub fn accrued(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        flow_volume: f64,
        price: f64,
    ) -> Result<Self, DispenserError> {
        let amount = elapsed_seconds(end - start) * flow_volume;
        Self {
            amount,
            revenue: amount * price,
        }
        .checked()
    }

    /// Returns `self` if both components are finite.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::Internal`] on overflow or `NaN`.
    pub fn checked(self) -> Result<Self, DispenserError> {
        if self.amount.is_finite() && self.revenue.is_finite() {
            Ok(self)
        } else {
            Err(DispenserError::Internal(
                "charge is not a finite number".to_string(),
            ))
        }
    }
}

impl Add for Charge {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            amount: self.amount + other.amount,
            revenue: self.revenue + other.revenue,
        }
    }
}

impl Sum for Charge {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Converts a time span to fractional seconds, clamping negative spans
/// (clock skew between open and close) to zero.
#[must_use]
pub fn elapsed_seconds(delta: TimeDelta) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let secs = delta.num_microseconds().map_or_else(
        || delta.num_milliseconds() as f64 / 1_000.0,
        |us| us as f64 / 1_000_000.0,
    );
    secs.max(0.0)
}
