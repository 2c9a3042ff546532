//! Concurrent dispenser storage with per-dispenser fine-grained locking.
//!
//! [`DispenserRegistry`] keeps every dispenser in a `BTreeMap` keyed by
//! [`DispenserId`], where each entry is individually protected by a
//! [`tokio::sync::RwLock`]. Ids are assigned in increasing order by the
//! store, so iterating the map yields dispensers in creation order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::DispenserId;
use super::dispenser_entry::DispenserEntry;
use crate::error::DispenserError;

/// Shared handle to a single dispenser entry.
pub type EntryLock = Arc<RwLock<DispenserEntry>>;

/// Central in-process view of all registered dispensers.
///
/// # Concurrency
///
/// - Multiple tasks may read the same dispenser concurrently.
/// - Open/close on different dispensers run in parallel.
/// - Open/close on the same dispenser are serialized by its write lock.
#[derive(Debug)]
pub struct DispenserRegistry {
    dispensers: RwLock<BTreeMap<DispenserId, EntryLock>>,
}

impl DispenserRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dispensers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Inserts a new dispenser entry.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::Internal`] if an entry with the same id is
    /// already registered, which means the store handed out a duplicate id.
    pub async fn insert(&self, entry: DispenserEntry) -> Result<DispenserId, DispenserError> {
        let id = entry.dispenser.id;
        let mut map = self.dispensers.write().await;
        if map.contains_key(&id) {
            return Err(DispenserError::Internal(format!(
                "dispenser {id} already registered"
            )));
        }
        map.insert(id, Arc::new(RwLock::new(entry)));
        Ok(id)
    }

    /// Replaces the registry contents with entries loaded from the store.
    pub async fn hydrate(&self, entries: Vec<DispenserEntry>) {
        let mut map = self.dispensers.write().await;
        map.clear();
        for entry in entries {
            map.insert(entry.dispenser.id, Arc::new(RwLock::new(entry)));
        }
    }

    /// Returns the entry registered under the entry's id, inserting `entry`
    /// first if the id is not present yet.
    pub async fn get_or_insert(&self, entry: DispenserEntry) -> EntryLock {
        let mut map = self.dispensers.write().await;
        Arc::clone(
            map.entry(entry.dispenser.id)
                .or_insert_with(|| Arc::new(RwLock::new(entry))),
        )
    }

    /// Returns the lock guarding a single dispenser.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::DispenserNotFound`] if no dispenser with
    /// the given id exists.
    pub async fn get(&self, id: DispenserId) -> Result<EntryLock, DispenserError> {
        let map = self.dispensers.read().await;
        map.get(&id)
            .cloned()
            .ok_or(DispenserError::DispenserNotFound(id))
    }

    /// Returns handles to every entry in creation order.
    ///
    /// The outer lock is released before the caller touches any entry, so
    /// slow readers never block registrations.
    pub async fn entries(&self) -> Vec<EntryLock> {
        self.dispensers.read().await.values().cloned().collect()
    }

    /// Returns the number of registered dispensers.
    pub async fn len(&self) -> usize {
        self.dispensers.read().await.len()
    }

    /// Returns `true` if no dispenser is registered.
    pub async fn is_empty(&self) -> bool {
        self.dispensers.read().await.is_empty()
    }
}

impl Default for DispenserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
