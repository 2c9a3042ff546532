//! Usage records: one open-to-close session of a dispenser.

use chrono::{DateTime, Utc};

use super::{Charge, Dispenser, DispenserId, UsageRecordId};
use crate::error::DispenserError;

/// Lifecycle of a usage record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordStatus {
    /// The dispenser is still open; amount and revenue are projected on
    /// demand and never stored.
    InProgress,
    /// The session was closed; the stored charge is final.
    Finalized {
        /// Close timestamp.
        end_time: DateTime<Utc>,
        /// Charge computed at close time.
        charge: Charge,
    },
}

/// A single metered session ("transaction" in the HTTP API).
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    /// Store-assigned identifier.
    pub id: UsageRecordId,
    /// Owning dispenser.
    pub dispenser_id: DispenserId,
    /// Open timestamp.
    pub start_time: DateTime<Utc>,
    /// In-progress or finalized.
    pub status: RecordStatus,
}

impl UsageRecord {
    /// Creates an in-progress record started at `start_time`.
    #[must_use]
    pub const fn started(
        id: UsageRecordId,
        dispenser_id: DispenserId,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            dispenser_id,
            start_time,
            status: RecordStatus::InProgress,
        }
    }

    /// Returns `true` while the session has no end time.
    #[must_use]
    pub const fn is_in_progress(&self) -> bool {
        matches!(self.status, RecordStatus::InProgress)
    }

    /// Close timestamp, if finalized.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        match self.status {
            RecordStatus::InProgress => None,
            RecordStatus::Finalized { end_time, .. } => Some(end_time),
        }
    }

    /// Returns the charge of this record as of `as_of`.
    ///
    /// Finalized records return their stored charge unchanged. In-progress
    /// records are projected from `as_of - start_time` with the owner's
    /// current rates; the record itself is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::Internal`] if the projection overflows.
    pub fn charge_as_of(
        &self,
        owner: &Dispenser,
        as_of: DateTime<Utc>,
    ) -> Result<Charge, DispenserError> {
        match self.status {
            RecordStatus::Finalized { charge, .. } => Ok(charge),
            RecordStatus::InProgress => {
                Charge::accrued(self.start_time, as_of, owner.flow_volume, owner.price)
            }
        }
    }

    /// Marks the record finalized with the given end time and charge.
    pub fn finalize(&mut self, end_time: DateTime<Utc>, charge: Charge) {
        self.status = RecordStatus::Finalized { end_time, charge };
    }
}
