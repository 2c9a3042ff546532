//! Dispenser service: registration, metering and statistics.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::dispenser_registry::EntryLock;
use crate::domain::{
    Charge, Dispenser, DispenserEntry, DispenserId, DispenserRates, DispenserRegistry,
    DispenserStats, UsageRecord,
};
use crate::error::DispenserError;
use crate::persistence::DispenserStore;

/// Orchestration layer for all dispenser operations.
///
/// Owns the in-process [`DispenserRegistry`] and the durable
/// [`DispenserStore`]. Every transition follows the same pattern: acquire
/// the entry's write lock → validate against in-memory state → persist →
/// apply to the entry. The lock is held across the store call, so
/// transitions on one dispenser are serialized and a store failure leaves
/// the entry untouched.
///
/// The store is authoritative. When it rejects a transition because its
/// state differs from the registry (another instance sharing the database
/// got there first), the entry is reloaded from the store before the
/// decision is re-evaluated.
#[derive(Debug, Clone)]
pub struct DispenserService {
    registry: Arc<DispenserRegistry>,
    store: Arc<dyn DispenserStore>,
}

impl DispenserService {
    /// Creates a new `DispenserService`.
    #[must_use]
    pub fn new(registry: Arc<DispenserRegistry>, store: Arc<dyn DispenserStore>) -> Self {
        Self { registry, store }
    }

    /// Returns a reference to the inner [`DispenserRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<DispenserRegistry> {
        &self.registry
    }

    /// Loads every stored dispenser and its records into the registry.
    ///
    /// Returns the number of dispensers loaded.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::PersistenceError`] if the store cannot be
    /// read.
    pub async fn hydrate_from_store(&self) -> Result<usize, DispenserError> {
        let entries = self.store.load_dispensers().await?;
        let count = entries.len();
        self.registry.hydrate(entries).await;
        tracing::info!(dispensers = count, "registry hydrated from store");
        Ok(count)
    }

    /// Registers a new closed dispenser.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::InvalidRequest`] if either rate is not a
    /// finite positive number, or a storage error if persisting fails.
    pub async fn register(
        &self,
        flow_volume: f64,
        price: f64,
    ) -> Result<Dispenser, DispenserError> {
        let rates = DispenserRates::new(flow_volume, price)?;
        let dispenser = self.store.insert_dispenser(rates).await?;
        self.registry
            .insert(DispenserEntry::new(dispenser.clone()))
            .await?;

        tracing::info!(
            dispenser_id = %dispenser.id,
            flow_volume,
            price,
            "dispenser registered"
        );
        Ok(dispenser)
    }

    /// Returns the registry entry for `id`, pulling it from the store if
    /// this instance has not seen the dispenser yet.
    async fn entry(&self, id: DispenserId) -> Result<EntryLock, DispenserError> {
        match self.registry.get(id).await {
            Err(DispenserError::DispenserNotFound(_)) => {
                let entry = self
                    .store
                    .load_dispenser(id)
                    .await?
                    .ok_or(DispenserError::DispenserNotFound(id))?;
                Ok(self.registry.get_or_insert(entry).await)
            }
            found => found,
        }
    }

    /// Reloads `entry` from the store after the two disagreed.
    ///
    /// Failures are logged and leave the entry as it was.
    async fn resync(&self, entry: &mut DispenserEntry) {
        let id = entry.dispenser.id;
        match self.store.load_dispenser(id).await {
            Ok(Some(fresh)) => {
                if fresh.dispenser.is_open != entry.dispenser.is_open {
                    tracing::warn!(
                        dispenser_id = %id,
                        is_open = fresh.dispenser.is_open,
                        "registry entry was stale, reloaded from store"
                    );
                }
                *entry = fresh;
            }
            Ok(None) => tracing::warn!(dispenser_id = %id, "dispenser missing from store"),
            Err(e) => {
                tracing::warn!(dispenser_id = %id, error = %e, "failed to reload dispenser");
            }
        }
    }

    /// Returns the current configuration and state of a dispenser.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::DispenserNotFound`] if the id is unknown.
    pub async fn get(&self, id: DispenserId) -> Result<Dispenser, DispenserError> {
        let entry_lock = self.entry(id).await?;
        let entry = entry_lock.read().await;
        Ok(entry.dispenser.clone())
    }

    /// Lists all dispensers in creation order.
    pub async fn list(&self) -> Vec<Dispenser> {
        let mut dispensers = Vec::new();
        for entry_lock in self.registry.entries().await {
            dispensers.push(entry_lock.read().await.dispenser.clone());
        }
        dispensers
    }

    /// Opens a dispenser, starting a new usage session now.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::DispenserNotFound`],
    /// [`DispenserError::AlreadyOpen`], or a storage error.
    pub async fn open(&self, id: DispenserId) -> Result<UsageRecord, DispenserError> {
        self.open_at(id, Utc::now()).await
    }

    /// Opens a dispenser with an explicit session start time.
    ///
    /// A state conflict, whether detected locally or by the store, reloads
    /// the entry from the store once and re-evaluates before failing.
    pub(crate) async fn open_at(
        &self,
        id: DispenserId,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord, DispenserError> {
        let entry_lock = self.entry(id).await?;
        let mut entry = entry_lock.write().await;
        let mut resynced = false;

        loop {
            let attempt = match entry.check_can_open() {
                Ok(()) => self.store.open_session(id, now).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(record) => {
                    entry.apply_open(record.clone());
                    tracing::info!(
                        dispenser_id = %id,
                        record_id = %record.id,
                        "dispenser opened"
                    );
                    return Ok(record);
                }
                Err(e) if !resynced && is_state_conflict(&e) => {
                    self.resync(&mut entry).await;
                    resynced = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Closes a dispenser and bills the in-progress session.
    ///
    /// Returns the final charge.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::DispenserNotFound`],
    /// [`DispenserError::AlreadyClosed`],
    /// [`DispenserError::InternalInconsistency`], or a storage error.
    pub async fn close(&self, id: DispenserId) -> Result<Charge, DispenserError> {
        self.close_at(id, Utc::now()).await
    }

    /// Closes a dispenser with an explicit close time.
    ///
    /// Conflicts are handled as in [`Self::open_at`].
    pub(crate) async fn close_at(
        &self,
        id: DispenserId,
        now: DateTime<Utc>,
    ) -> Result<Charge, DispenserError> {
        let entry_lock = self.entry(id).await?;
        let mut entry = entry_lock.write().await;
        let mut resynced = false;

        loop {
            let attempt = match entry.prepare_close(now) {
                Ok(pending) => self
                    .store
                    .close_session(id, &pending)
                    .await
                    .map(|()| pending),
                Err(e) => Err(e),
            };
            match attempt {
                Ok(pending) => {
                    entry.apply_close(&pending);
                    tracing::info!(
                        dispenser_id = %id,
                        record_id = %pending.record_id,
                        amount = pending.charge.amount,
                        revenue = pending.charge.revenue,
                        "dispenser closed"
                    );
                    return Ok(pending.charge);
                }
                Err(e) if !resynced && is_state_conflict(&e) => {
                    self.resync(&mut entry).await;
                    resynced = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns the usage statistics of one dispenser as of now.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::DispenserNotFound`] if the id is unknown,
    /// or [`DispenserError::Internal`] if a projection overflows.
    pub async fn dispenser_stats(
        &self,
        id: DispenserId,
    ) -> Result<DispenserStats, DispenserError> {
        self.dispenser_stats_at(id, Utc::now()).await
    }

    /// Returns the usage statistics of one dispenser as of `as_of`.
    pub(crate) async fn dispenser_stats_at(
        &self,
        id: DispenserId,
        as_of: DateTime<Utc>,
    ) -> Result<DispenserStats, DispenserError> {
        let entry_lock = self.entry(id).await?;
        let entry = entry_lock.read().await;
        entry.statistics(as_of)
    }

    /// Returns the usage statistics of every dispenser as of now.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::Internal`] if a projection overflows.
    pub async fn all_stats(&self) -> Result<Vec<DispenserStats>, DispenserError> {
        self.all_stats_at(Utc::now()).await
    }

    /// Returns the usage statistics of every dispenser as of `as_of`, in
    /// creation order.
    pub(crate) async fn all_stats_at(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<DispenserStats>, DispenserError> {
        let mut stats = Vec::new();
        for entry_lock in self.registry.entries().await {
            stats.push(entry_lock.read().await.statistics(as_of)?);
        }
        Ok(stats)
    }
}

const fn is_state_conflict(err: &DispenserError) -> bool {
    matches!(
        err,
        DispenserError::AlreadyOpen(_)
            | DispenserError::AlreadyClosed(_)
            | DispenserError::InternalInconsistency(_)
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::TimeDelta;

    use super::*;
    use crate::domain::{Admin, PendingClose};
    use crate::persistence::MemoryStore;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn make_service() -> DispenserService {
        DispenserService::new(
            Arc::new(DispenserRegistry::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    async fn register(service: &DispenserService, flow_volume: f64, price: f64) -> DispenserId {
        let Ok(dispenser) = service.register(flow_volume, price).await else {
            panic!("registration failed");
        };
        dispenser.id
    }

    /// Store that delegates to [`MemoryStore`] but can be told to fail
    /// every session write.
    #[derive(Debug, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), DispenserError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(DispenserError::PersistenceError(
                    "connection reset".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DispenserStore for FlakyStore {
        async fn insert_dispenser(
            &self,
            rates: DispenserRates,
        ) -> Result<Dispenser, DispenserError> {
            self.inner.insert_dispenser(rates).await
        }

        async fn open_session(
            &self,
            dispenser_id: DispenserId,
            start_time: DateTime<Utc>,
        ) -> Result<UsageRecord, DispenserError> {
            self.check()?;
            self.inner.open_session(dispenser_id, start_time).await
        }

        async fn close_session(
            &self,
            dispenser_id: DispenserId,
            pending: &PendingClose,
        ) -> Result<(), DispenserError> {
            self.check()?;
            self.inner.close_session(dispenser_id, pending).await
        }

        async fn load_dispenser(
            &self,
            dispenser_id: DispenserId,
        ) -> Result<Option<DispenserEntry>, DispenserError> {
            self.inner.load_dispenser(dispenser_id).await
        }

        async fn load_dispensers(&self) -> Result<Vec<DispenserEntry>, DispenserError> {
            self.inner.load_dispensers().await
        }

        async fn find_admin(&self, username: &str) -> Result<Option<Admin>, DispenserError> {
            self.inner.find_admin(username).await
        }

        async fn insert_admin(
            &self,
            username: &str,
            password_hash: &str,
        ) -> Result<Admin, DispenserError> {
            self.inner.insert_admin(username, password_hash).await
        }
    }

    #[tokio::test]
    async fn register_then_get() {
        let service = make_service();
        let id = register(&service, 0.5, 2.0).await;

        let Ok(dispenser) = service.get(id).await else {
            panic!("dispenser not found");
        };
        assert!(approx(dispenser.flow_volume, 0.5));
        assert!(approx(dispenser.price, 2.0));
        assert!(!dispenser.is_open);
    }

    #[tokio::test]
    async fn register_rejects_non_positive_rates() {
        let service = make_service();
        assert!(matches!(
            service.register(0.0, 2.0).await,
            Err(DispenserError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.register(1.0, -1.0).await,
            Err(DispenserError::InvalidRequest(_))
        ));
        assert!(service.list().await.is_empty());
    }

    #[tokio::test]
    async fn list_is_in_creation_order() {
        let service = make_service();
        let first = register(&service, 1.0, 1.0).await;
        let second = register(&service, 2.0, 2.0).await;

        let ids: Vec<_> = service.list().await.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn unknown_dispenser_is_not_found() {
        let service = make_service();
        let id = DispenserId::new(42);
        assert!(matches!(
            service.get(id).await,
            Err(DispenserError::DispenserNotFound(_))
        ));
        assert!(matches!(
            service.open(id).await,
            Err(DispenserError::DispenserNotFound(_))
        ));
        assert!(matches!(
            service.close(id).await,
            Err(DispenserError::DispenserNotFound(_))
        ));
        assert!(matches!(
            service.dispenser_stats(id).await,
            Err(DispenserError::DispenserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn five_seconds_at_half_flow_and_double_price() {
        let service = make_service();
        let id = register(&service, 0.5, 2.0).await;
        let t0 = Utc::now();

        assert!(service.open_at(id, t0).await.is_ok());
        let Ok(charge) = service.close_at(id, t0 + TimeDelta::seconds(5)).await else {
            panic!("close failed");
        };
        assert!(approx(charge.amount, 2.5));
        assert!(approx(charge.revenue, 5.0));

        let Ok(dispenser) = service.get(id).await else {
            panic!("dispenser not found");
        };
        assert!(!dispenser.is_open);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_opens_have_exactly_one_winner() {
        let service = Arc::new(make_service());
        let id = register(&service, 1.0, 1.0).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move { service.open(id).await }));
        }

        let mut opened = 0;
        let mut already_open = 0;
        for handle in handles {
            match handle.await {
                Ok(Ok(_)) => opened += 1,
                Ok(Err(DispenserError::AlreadyOpen(_))) => already_open += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(opened, 1);
        assert_eq!(already_open, 15);

        let Ok(stats) = service.dispenser_stats(id).await else {
            panic!("stats failed");
        };
        assert_eq!(stats.total_transactions, 1);
    }

    #[tokio::test]
    async fn second_close_fails_and_keeps_amounts() {
        let service = make_service();
        let id = register(&service, 2.0, 3.0).await;
        let t0 = Utc::now();

        assert!(service.open_at(id, t0).await.is_ok());
        assert!(service.close_at(id, t0 + TimeDelta::seconds(10)).await.is_ok());
        let result = service.close_at(id, t0 + TimeDelta::seconds(20)).await;
        assert!(matches!(result, Err(DispenserError::AlreadyClosed(_))));

        let Ok(stats) = service.dispenser_stats_at(id, t0 + TimeDelta::seconds(30)).await
        else {
            panic!("stats failed");
        };
        assert!(approx(stats.total.amount, 20.0));
        assert!(approx(stats.total.revenue, 60.0));
    }

    #[tokio::test]
    async fn stats_grow_while_open_and_freeze_after_close() {
        let service = make_service();
        let id = register(&service, 1.0, 1.0).await;
        let t0 = Utc::now();
        assert!(service.open_at(id, t0).await.is_ok());

        let Ok(early) = service.dispenser_stats_at(id, t0 + TimeDelta::seconds(1)).await else {
            panic!("stats failed");
        };
        let Ok(later) = service.dispenser_stats_at(id, t0 + TimeDelta::seconds(2)).await else {
            panic!("stats failed");
        };
        assert!(later.total.amount > early.total.amount);
        assert!(later.dispenser.is_open);
        assert_eq!(later.records.first().and_then(|r| r.end_time), None);

        assert!(service.close_at(id, t0 + TimeDelta::seconds(3)).await.is_ok());
        let Ok(after) = service.dispenser_stats_at(id, t0 + TimeDelta::seconds(4)).await else {
            panic!("stats failed");
        };
        let Ok(much_after) = service.dispenser_stats_at(id, t0 + TimeDelta::hours(1)).await
        else {
            panic!("stats failed");
        };
        assert!(approx(after.total.amount, 3.0));
        assert_eq!(after.total, much_after.total);
    }

    #[tokio::test]
    async fn all_stats_sums_each_dispenser() {
        let service = make_service();
        let first = register(&service, 1.0, 2.0).await;
        let second = register(&service, 2.0, 3.0).await;
        let t0 = Utc::now();

        // first: one 5 s session -> 5 units, 10 revenue
        assert!(service.open_at(first, t0).await.is_ok());
        assert!(service.close_at(first, t0 + TimeDelta::seconds(5)).await.is_ok());

        // second: two 5 s sessions -> 10 units, 30 revenue each
        for round in 0..2 {
            let start = t0 + TimeDelta::seconds(10 * round);
            assert!(service.open_at(second, start).await.is_ok());
            assert!(
                service
                    .close_at(second, start + TimeDelta::seconds(5))
                    .await
                    .is_ok()
            );
        }
        // and one still open
        assert!(service.open_at(second, t0 + TimeDelta::seconds(30)).await.is_ok());

        let Ok(stats) = service.all_stats_at(t0 + TimeDelta::seconds(30)).await else {
            panic!("stats failed");
        };
        assert_eq!(stats.len(), 2);

        let Some(s1) = stats.first() else {
            panic!("missing first dispenser");
        };
        assert_eq!(s1.dispenser.id, first);
        assert_eq!(s1.total_transactions, 1);
        assert!(approx(s1.total.amount, 5.0));
        assert!(approx(s1.total.revenue, 10.0));

        let Some(s2) = stats.get(1) else {
            panic!("missing second dispenser");
        };
        assert_eq!(s2.total_transactions, 3);
        assert!(approx(s2.total.amount, 20.0));
        assert!(approx(s2.total.revenue, 60.0));
    }

    #[tokio::test]
    async fn open_without_record_is_inconsistent() {
        let service = make_service();
        let Ok(rates) = DispenserRates::new(1.0, 1.0) else {
            panic!("valid rates rejected");
        };
        let mut dispenser = Dispenser::new(DispenserId::new(9), rates);
        dispenser.is_open = true;
        service
            .registry()
            .hydrate(vec![DispenserEntry::new(dispenser)])
            .await;

        let result = service.close(DispenserId::new(9)).await;
        assert!(matches!(
            result,
            Err(DispenserError::InternalInconsistency(_))
        ));
    }

    #[tokio::test]
    async fn store_failure_leaves_state_untouched() {
        let store = Arc::new(FlakyStore::default());
        let service = DispenserService::new(
            Arc::new(DispenserRegistry::new()),
            Arc::clone(&store) as Arc<dyn DispenserStore>,
        );
        let id = register(&service, 1.0, 1.0).await;
        let t0 = Utc::now();

        store.failing.store(true, Ordering::SeqCst);
        assert!(matches!(
            service.open_at(id, t0).await,
            Err(DispenserError::PersistenceError(_))
        ));
        let Ok(stats) = service.dispenser_stats_at(id, t0).await else {
            panic!("stats failed");
        };
        assert!(!stats.dispenser.is_open);
        assert_eq!(stats.total_transactions, 0);

        store.failing.store(false, Ordering::SeqCst);
        assert!(service.open_at(id, t0).await.is_ok());

        store.failing.store(true, Ordering::SeqCst);
        assert!(
            service
                .close_at(id, t0 + TimeDelta::seconds(5))
                .await
                .is_err()
        );
        let Ok(stats) = service.dispenser_stats_at(id, t0).await else {
            panic!("stats failed");
        };
        assert!(stats.dispenser.is_open);
        assert_eq!(stats.records.first().and_then(|r| r.end_time), None);

        store.failing.store(false, Ordering::SeqCst);
        let Ok(charge) = service.close_at(id, t0 + TimeDelta::seconds(5)).await else {
            panic!("close failed after recovery");
        };
        assert!(approx(charge.amount, 5.0));
    }

    #[tokio::test]
    async fn hydrate_restores_stored_sessions() {
        let store: Arc<dyn DispenserStore> = Arc::new(MemoryStore::new());
        let first = DispenserService::new(Arc::new(DispenserRegistry::new()), Arc::clone(&store));
        let id = register(&first, 1.0, 2.0).await;
        let t0 = Utc::now();
        assert!(first.open_at(id, t0).await.is_ok());

        let second = DispenserService::new(Arc::new(DispenserRegistry::new()), store);
        let Ok(count) = second.hydrate_from_store().await else {
            panic!("hydrate failed");
        };
        assert_eq!(count, 1);

        let Ok(charge) = second.close_at(id, t0 + TimeDelta::seconds(4)).await else {
            panic!("close after hydrate failed");
        };
        assert!(approx(charge.amount, 4.0));
        assert!(approx(charge.revenue, 8.0));
    }

    #[tokio::test]
    async fn instances_sharing_a_store_resync_on_conflict() {
        let store: Arc<dyn DispenserStore> = Arc::new(MemoryStore::new());
        let a = DispenserService::new(Arc::new(DispenserRegistry::new()), Arc::clone(&store));
        let b = DispenserService::new(Arc::new(DispenserRegistry::new()), Arc::clone(&store));
        let id = register(&a, 1.0, 2.0).await;
        assert!(b.hydrate_from_store().await.is_ok());
        let t0 = Utc::now();

        assert!(a.open_at(id, t0).await.is_ok());

        // b still believes the dispenser is closed until the store says otherwise
        assert!(matches!(
            b.open_at(id, t0 + TimeDelta::seconds(1)).await,
            Err(DispenserError::AlreadyOpen(_))
        ));
        let Ok(seen_by_b) = b.get(id).await else {
            panic!("dispenser not found");
        };
        assert!(seen_by_b.is_open);

        let Ok(charge) = b.close_at(id, t0 + TimeDelta::seconds(4)).await else {
            panic!("b could not close a dispenser opened by a");
        };
        assert!(approx(charge.amount, 4.0));
        assert!(approx(charge.revenue, 8.0));

        // a is now stale in the other direction
        assert!(matches!(
            a.close_at(id, t0 + TimeDelta::seconds(5)).await,
            Err(DispenserError::AlreadyClosed(_))
        ));
        let Ok(seen_by_a) = a.get(id).await else {
            panic!("dispenser not found");
        };
        assert!(!seen_by_a.is_open);

        // a reopens; b closes it without having seen the reopen
        assert!(a.open_at(id, t0 + TimeDelta::seconds(10)).await.is_ok());
        let Ok(charge) = b.close_at(id, t0 + TimeDelta::seconds(13)).await else {
            panic!("b could not close the reopened session");
        };
        assert!(approx(charge.amount, 3.0));

        let Ok(stats) = b.dispenser_stats_at(id, t0 + TimeDelta::seconds(20)).await else {
            panic!("stats failed");
        };
        assert_eq!(stats.total_transactions, 2);
        assert!(approx(stats.total.amount, 7.0));
        assert!(!stats.dispenser.is_open);
    }

    #[tokio::test]
    async fn dispenser_registered_elsewhere_is_found_through_store() {
        let store: Arc<dyn DispenserStore> = Arc::new(MemoryStore::new());
        let a = DispenserService::new(Arc::new(DispenserRegistry::new()), Arc::clone(&store));
        let b = DispenserService::new(Arc::new(DispenserRegistry::new()), store);
        let id = register(&a, 1.0, 1.0).await;

        let Ok(dispenser) = b.get(id).await else {
            panic!("b did not find the dispenser");
        };
        assert_eq!(dispenser.id, id);
        assert!(b.open(id).await.is_ok());
        assert!(matches!(
            b.get(DispenserId::new(404)).await,
            Err(DispenserError::DispenserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn overflowing_charge_is_rejected_and_session_stays_open() {
        let service = make_service();
        let id = register(&service, 1.0, 1.0).await;
        let t0 = Utc::now();
        assert!(service.open_at(id, t0).await.is_ok());

        let Ok(entry_lock) = service.registry().get(id).await else {
            panic!("dispenser not found");
        };
        {
            let mut entry = entry_lock.write().await;
            entry.dispenser.flow_volume = f64::MAX;
            entry.dispenser.price = f64::MAX;
        }

        let result = service.close_at(id, t0 + TimeDelta::seconds(2)).await;
        assert!(matches!(result, Err(DispenserError::Internal(_))));
        assert!(service.all_stats_at(t0 + TimeDelta::seconds(2)).await.is_err());

        let Ok(dispenser) = service.get(id).await else {
            panic!("dispenser not found");
        };
        assert!(dispenser.is_open);
    }
}
