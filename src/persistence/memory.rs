//! In-memory implementation of the persistence layer.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::DispenserStore;
use crate::domain::{
    Admin, Dispenser, DispenserEntry, DispenserId, DispenserRates, PendingClose, UsageRecord,
    UsageRecordId,
};
use crate::error::DispenserError;

#[derive(Debug, Default)]
struct MemoryState {
    dispensers: BTreeMap<DispenserId, Dispenser>,
    records: Vec<UsageRecord>,
    admins: Vec<Admin>,
    last_dispenser_id: i64,
    last_record_id: i64,
    last_admin_id: i64,
}

impl MemoryState {
    fn entry_for(&self, dispenser: &Dispenser) -> DispenserEntry {
        let records = self
            .records
            .iter()
            .filter(|r| r.dispenser_id == dispenser.id)
            .cloned()
            .collect();
        DispenserEntry::from_parts(dispenser.clone(), records)
    }
}

/// Process-local store used when PostgreSQL persistence is disabled.
///
/// Mirrors the guarantees of the database adapter: ids increase
/// monotonically from 1 and every session change happens under a single
/// mutex, so it is all-or-nothing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DispenserStore for MemoryStore {
    async fn insert_dispenser(&self, rates: DispenserRates) -> Result<Dispenser, DispenserError> {
        let mut state = self.state.lock().await;
        state.last_dispenser_id += 1;
        let dispenser = Dispenser::new(DispenserId::new(state.last_dispenser_id), rates);
        state.dispensers.insert(dispenser.id, dispenser.clone());
        Ok(dispenser)
    }

    async fn open_session(
        &self,
        dispenser_id: DispenserId,
        start_time: DateTime<Utc>,
    ) -> Result<UsageRecord, DispenserError> {
        let mut state = self.state.lock().await;
        let is_open = state
            .dispensers
            .get(&dispenser_id)
            .map(|d| d.is_open)
            .ok_or(DispenserError::DispenserNotFound(dispenser_id))?;
        if is_open {
            return Err(DispenserError::AlreadyOpen(dispenser_id));
        }

        state.last_record_id += 1;
        let record = UsageRecord::started(
            UsageRecordId::new(state.last_record_id),
            dispenser_id,
            start_time,
        );
        state.records.push(record.clone());
        if let Some(dispenser) = state.dispensers.get_mut(&dispenser_id) {
            dispenser.is_open = true;
        }
        Ok(record)
    }

    async fn close_session(
        &self,
        dispenser_id: DispenserId,
        pending: &PendingClose,
    ) -> Result<(), DispenserError> {
        let mut state = self.state.lock().await;
        let is_open = state
            .dispensers
            .get(&dispenser_id)
            .map(|d| d.is_open)
            .ok_or(DispenserError::DispenserNotFound(dispenser_id))?;
        if !is_open {
            return Err(DispenserError::AlreadyClosed(dispenser_id));
        }

        let record = state
            .records
            .iter_mut()
            .find(|r| {
                r.id == pending.record_id && r.dispenser_id == dispenser_id && r.is_in_progress()
            })
            .ok_or(DispenserError::InternalInconsistency(dispenser_id))?;
        record.finalize(pending.end_time, pending.charge);

        if let Some(dispenser) = state.dispensers.get_mut(&dispenser_id) {
            dispenser.is_open = false;
        }
        Ok(())
    }

    async fn load_dispenser(
        &self,
        dispenser_id: DispenserId,
    ) -> Result<Option<DispenserEntry>, DispenserError> {
        let state = self.state.lock().await;
        Ok(state
            .dispensers
            .get(&dispenser_id)
            .map(|dispenser| state.entry_for(dispenser)))
    }

    async fn load_dispensers(&self) -> Result<Vec<DispenserEntry>, DispenserError> {
        let state = self.state.lock().await;
        Ok(state
            .dispensers
            .values()
            .map(|dispenser| state.entry_for(dispenser))
            .collect())
    }

    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, DispenserError> {
        let state = self.state.lock().await;
        Ok(state
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn insert_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Admin, DispenserError> {
        let mut state = self.state.lock().await;
        if state.admins.iter().any(|a| a.username == username) {
            return Err(DispenserError::InvalidRequest(format!(
                "admin {username} already exists"
            )));
        }
        state.last_admin_id += 1;
        let admin = Admin {
            id: state.last_admin_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        state.admins.push(admin.clone());
        Ok(admin)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::domain::Charge;

    fn rates() -> DispenserRates {
        let Ok(rates) = DispenserRates::new(1.0, 2.0) else {
            panic!("valid rates rejected");
        };
        rates
    }

    #[tokio::test]
    async fn ids_increase_from_one() {
        let store = MemoryStore::new();
        let Ok(a) = store.insert_dispenser(rates()).await else {
            panic!("insert failed");
        };
        let Ok(b) = store.insert_dispenser(rates()).await else {
            panic!("insert failed");
        };
        assert_eq!(a.id.get(), 1);
        assert_eq!(b.id.get(), 2);
    }

    #[tokio::test]
    async fn open_and_close_round_trip_through_load() {
        let store = MemoryStore::new();
        let Ok(dispenser) = store.insert_dispenser(rates()).await else {
            panic!("insert failed");
        };
        let start = Utc::now();
        let Ok(record) = store.open_session(dispenser.id, start).await else {
            panic!("open failed");
        };

        let pending = PendingClose {
            record_id: record.id,
            end_time: start + TimeDelta::seconds(2),
            charge: Charge {
                amount: 2.0,
                revenue: 4.0,
            },
        };
        assert!(store.close_session(dispenser.id, &pending).await.is_ok());

        let Ok(entries) = store.load_dispensers().await else {
            panic!("load failed");
        };
        let Some(entry) = entries.first() else {
            panic!("expected one entry");
        };
        assert!(!entry.dispenser.is_open);
        assert_eq!(entry.records.len(), 1);
        assert!(entry.in_progress_record().is_none());
    }

    #[tokio::test]
    async fn open_on_open_dispenser_is_rejected() {
        let store = MemoryStore::new();
        let Ok(dispenser) = store.insert_dispenser(rates()).await else {
            panic!("insert failed");
        };
        let _ = store.open_session(dispenser.id, Utc::now()).await;
        let result = store.open_session(dispenser.id, Utc::now()).await;
        assert!(matches!(result, Err(DispenserError::AlreadyOpen(_))));
    }

    #[tokio::test]
    async fn close_with_unknown_record_is_inconsistent() {
        let store = MemoryStore::new();
        let Ok(dispenser) = store.insert_dispenser(rates()).await else {
            panic!("insert failed");
        };
        let _ = store.open_session(dispenser.id, Utc::now()).await;
        let pending = PendingClose {
            record_id: UsageRecordId::new(99),
            end_time: Utc::now(),
            charge: Charge::default(),
        };
        let result = store.close_session(dispenser.id, &pending).await;
        assert!(matches!(
            result,
            Err(DispenserError::InternalInconsistency(_))
        ));
    }

    #[tokio::test]
    async fn load_single_dispenser_with_its_records() {
        let store = MemoryStore::new();
        let Ok(first) = store.insert_dispenser(rates()).await else {
            panic!("insert failed");
        };
        let Ok(second) = store.insert_dispenser(rates()).await else {
            panic!("insert failed");
        };
        let _ = store.open_session(second.id, Utc::now()).await;

        let Ok(Some(entry)) = store.load_dispenser(second.id).await else {
            panic!("dispenser not loaded");
        };
        assert!(entry.dispenser.is_open);
        assert_eq!(entry.records.len(), 1);

        let Ok(Some(entry)) = store.load_dispenser(first.id).await else {
            panic!("dispenser not loaded");
        };
        assert!(entry.records.is_empty());

        let missing = store.load_dispenser(DispenserId::new(42)).await;
        assert!(matches!(missing, Ok(None)));
    }

    #[tokio::test]
    async fn duplicate_admin_is_rejected() {
        let store = MemoryStore::new();
        assert!(store.insert_admin("root", "hash").await.is_ok());
        assert!(store.insert_admin("root", "hash").await.is_err());

        let Ok(found) = store.find_admin("root").await else {
            panic!("lookup failed");
        };
        assert!(found.is_some());
    }
}
