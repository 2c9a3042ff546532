//! Database row models and their conversion into domain types.

use chrono::{DateTime, Utc};

use crate::domain::{
    Admin, Charge, Dispenser, DispenserId, RecordStatus, UsageRecord, UsageRecordId,
};

/// A row of the `dispensers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DispenserRow {
    /// `BIGSERIAL` primary key.
    pub id: i64,
    /// Units per second.
    pub flow_volume: f64,
    /// Price per unit.
    pub price: f64,
    /// Open/closed flag.
    pub is_open: bool,
}

impl From<DispenserRow> for Dispenser {
    fn from(row: DispenserRow) -> Self {
        Self {
            id: DispenserId::new(row.id),
            flow_volume: row.flow_volume,
            price: row.price,
            is_open: row.is_open,
        }
    }
}

/// A row of the `usage_records` table.
///
/// `amount` and `revenue` stay at their `0` default until `end_time` is
/// set.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsageRecordRow {
    /// `BIGSERIAL` primary key.
    pub id: i64,
    /// Owning dispenser.
    pub dispenser_id: i64,
    /// Open timestamp.
    pub start_time: DateTime<Utc>,
    /// Close timestamp, `NULL` while in progress.
    pub end_time: Option<DateTime<Utc>>,
    /// Units dispensed.
    pub amount: f64,
    /// Money owed.
    pub revenue: f64,
}

impl From<UsageRecordRow> for UsageRecord {
    fn from(row: UsageRecordRow) -> Self {
        let status = match row.end_time {
            None => RecordStatus::InProgress,
            Some(end_time) => RecordStatus::Finalized {
                end_time,
                charge: Charge {
                    amount: row.amount,
                    revenue: row.revenue,
                },
            },
        };
        Self {
            id: UsageRecordId::new(row.id),
            dispenser_id: DispenserId::new(row.dispenser_id),
            start_time: row.start_time,
            status,
        }
    }
}

/// A row of the `admins` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminRow {
    /// `BIGSERIAL` primary key.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// bcrypt hash.
    pub password_hash: String,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_end_time_maps_to_in_progress() {
        let row = UsageRecordRow {
            id: 1,
            dispenser_id: 2,
            start_time: Utc::now(),
            end_time: None,
            amount: 0.0,
            revenue: 0.0,
        };
        let record = UsageRecord::from(row);
        assert!(record.is_in_progress());
        assert_eq!(record.dispenser_id, DispenserId::new(2));
    }

    #[test]
    fn end_time_maps_to_finalized_with_stored_charge() {
        let start = Utc::now();
        let row = UsageRecordRow {
            id: 1,
            dispenser_id: 2,
            start_time: start,
            end_time: Some(start),
            amount: 10.0,
            revenue: 30.0,
        };
        let record = UsageRecord::from(row);
        assert_eq!(
            record.status,
            RecordStatus::Finalized {
                end_time: start,
                charge: Charge {
                    amount: 10.0,
                    revenue: 30.0,
                },
            }
        );
    }
}
