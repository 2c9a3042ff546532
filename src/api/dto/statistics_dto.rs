//! Usage statistics DTOs.

use serde::Serialize;

use super::common_dto::format_timestamp;
use crate::domain::{DispenserId, DispenserStats, RecordStats, UsageRecordId};

/// One usage record in a statistics response.
#[derive(Debug, Serialize)]
pub struct TransactionStatsDto {
    /// Usage record identifier.
    pub transaction_id: UsageRecordId,
    /// Open timestamp.
    pub start_time: String,
    /// Close timestamp, `null` while in progress.
    pub end_time: Option<String>,
    /// Units dispensed (projected while in progress).
    pub amount: f64,
    /// Revenue (projected while in progress).
    pub revenue: f64,
}

impl From<&RecordStats> for TransactionStatsDto {
    fn from(r: &RecordStats) -> Self {
        Self {
            transaction_id: r.id,
            start_time: format_timestamp(r.start_time),
            end_time: r.end_time.map(format_timestamp),
            amount: r.charge.amount,
            revenue: r.charge.revenue,
        }
    }
}

/// Response body for `GET /api/statistics/{id}` and each element of
/// `GET /api/statistics`.
#[derive(Debug, Serialize)]
pub struct DispenserStatsResponse {
    /// Dispenser identifier.
    pub dispenser_id: DispenserId,
    /// Current flow rate.
    pub flow_volume: f64,
    /// Current unit price.
    pub price: f64,
    /// Whether a session is in progress.
    pub is_open: bool,
    /// Number of sessions, open or closed.
    pub total_transactions: usize,
    /// Sum of units dispensed.
    pub total_amount: f64,
    /// Sum of revenue.
    pub total_revenue: f64,
    /// Per-session breakdown in creation order.
    pub transactions: Vec<TransactionStatsDto>,
}

impl From<DispenserStats> for DispenserStatsResponse {
    fn from(s: DispenserStats) -> Self {
        Self {
            dispenser_id: s.dispenser.id,
            flow_volume: s.dispenser.flow_volume,
            price: s.dispenser.price,
            is_open: s.dispenser.is_open,
            total_transactions: s.total_transactions,
            total_amount: s.total.amount,
            total_revenue: s.total.revenue,
            transactions: s.records.iter().map(TransactionStatsDto::from).collect(),
        }
    }
}
