//! Usage statistics snapshots.

use chrono::{DateTime, Utc};

use super::{Charge, Dispenser, UsageRecordId};

/// Per-record line of a statistics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStats {
    /// Usage record identifier.
    pub id: UsageRecordId,
    /// Open timestamp.
    pub start_time: DateTime<Utc>,
    /// Close timestamp, `None` while in progress.
    pub end_time: Option<DateTime<Utc>>,
    /// Stored charge, or the projection as of the snapshot time.
    pub charge: Charge,
}

/// Aggregated usage of one dispenser at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DispenserStats {
    /// Dispenser configuration and state at snapshot time.
    pub dispenser: Dispenser,
    /// Number of records, open or closed.
    pub total_transactions: usize,
    /// Sum of all record charges.
    pub total: Charge,
    /// Per-record breakdown in creation order.
    pub records: Vec<RecordStats>,
}
