//! Dispenser entry: configuration, state, and the usage records it owns.
//!
//! The open/close state machine lives here as a two-phase protocol. The
//! `check`/`prepare` half validates preconditions and computes what would
//! change without touching the entry; the `apply` half commits the change
//! once the store has accepted it. A store failure in between therefore
//! leaves the entry exactly as it was.

use chrono::{DateTime, Utc};

use super::dispenser_stats::{DispenserStats, RecordStats};
use super::{Charge, Dispenser, UsageRecord, UsageRecordId};
use crate::error::DispenserError;

/// Aggregate of a [`Dispenser`] and its [`UsageRecord`]s.
///
/// Each dispenser in the registry is stored as a `DispenserEntry` behind
/// its own lock.
#[derive(Debug, Clone)]
pub struct DispenserEntry {
    /// Configuration and open/closed flag.
    pub dispenser: Dispenser,

    /// All sessions of this dispenser, ordered by record id.
    pub records: Vec<UsageRecord>,
}

/// A validated close that has not been committed yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingClose {
    /// The in-progress record being finalized.
    pub record_id: UsageRecordId,
    /// Close timestamp, captured once.
    pub end_time: DateTime<Utc>,
    /// Final charge for the session.
    pub charge: Charge,
}

impl DispenserEntry {
    /// Creates an entry for a freshly registered dispenser.
    #[must_use]
    pub const fn new(dispenser: Dispenser) -> Self {
        Self {
            dispenser,
            records: Vec::new(),
        }
    }

    /// Rebuilds an entry from stored rows.
    #[must_use]
    pub fn from_parts(dispenser: Dispenser, mut records: Vec<UsageRecord>) -> Self {
        records.sort_by_key(|r| r.id);
        Self { dispenser, records }
    }

    /// Returns the in-progress record, preferring the latest start time if
    /// more than one exists.
    #[must_use]
    pub fn in_progress_record(&self) -> Option<&UsageRecord> {
        self.records
            .iter()
            .filter(|r| r.is_in_progress())
            .max_by_key(|r| r.start_time)
    }

    /// Checks that the dispenser may be opened.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::AlreadyOpen`] if the dispenser is open.
    pub fn check_can_open(&self) -> Result<(), DispenserError> {
        if self.dispenser.is_open {
            return Err(DispenserError::AlreadyOpen(self.dispenser.id));
        }
        Ok(())
    }

    /// Commits an open: appends the new in-progress record and flips the
    /// dispenser to open.
    pub fn apply_open(&mut self, record: UsageRecord) {
        self.records.push(record);
        self.dispenser.is_open = true;
    }

    /// Validates a close at `now` and computes the final charge with the
    /// dispenser's current rates.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::AlreadyClosed`] if the dispenser is closed,
    /// [`DispenserError::InternalInconsistency`] if it is open but owns
    /// no in-progress record, or [`DispenserError::Internal`] if the charge
    /// overflows.
    pub fn prepare_close(&self, now: DateTime<Utc>) -> Result<PendingClose, DispenserError> {
        if !self.dispenser.is_open {
            return Err(DispenserError::AlreadyClosed(self.dispenser.id));
        }
        let record = self
            .in_progress_record()
            .ok_or(DispenserError::InternalInconsistency(self.dispenser.id))?;

        Ok(PendingClose {
            record_id: record.id,
            end_time: now,
            charge: record.charge_as_of(&self.dispenser, now)?,
        })
    }

    /// Commits a close prepared by [`Self::prepare_close`].
    pub fn apply_close(&mut self, pending: &PendingClose) {
        if let Some(record) = self.records.iter_mut().find(|r| r.id == pending.record_id) {
            record.finalize(pending.end_time, pending.charge);
        }
        self.dispenser.is_open = false;
    }

    /// Folds every record into a statistics snapshot as of `as_of`.
    ///
    /// In-progress records are projected, finalized ones contribute their
    /// stored charge. Nothing is mutated.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::Internal`] if a projection or the total
    /// overflows.
    pub fn statistics(&self, as_of: DateTime<Utc>) -> Result<DispenserStats, DispenserError> {
        let records = self
            .records
            .iter()
            .map(|record| {
                Ok(RecordStats {
                    id: record.id,
                    start_time: record.start_time,
                    end_time: record.end_time(),
                    charge: record.charge_as_of(&self.dispenser, as_of)?,
                })
            })
            .collect::<Result<Vec<_>, DispenserError>>()?;
        let total = records.iter().map(|r| r.charge).sum::<Charge>().checked()?;

        Ok(DispenserStats {
            dispenser: self.dispenser.clone(),
            total_transactions: self.records.len(),
            total,
            records,
        })
    }
}
