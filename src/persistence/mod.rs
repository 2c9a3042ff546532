//! Persistence layer: durable storage for dispensers, usage records and
//! administrators.
//!
//! [`DispenserStore`] is the port the service layer writes through. Every
//! open/close is a single store call so the implementation can apply the
//! record write and the dispenser state flip atomically. Two adapters are
//! provided: [`MemoryStore`] for development and tests, and
//! [`PostgresStore`] backed by `sqlx::PgPool`.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Admin, Dispenser, DispenserEntry, DispenserId, DispenserRates, PendingClose, UsageRecord,
};
use crate::error::DispenserError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Durable storage for the dispenser domain.
///
/// Implementations must make [`Self::open_session`] and
/// [`Self::close_session`] all-or-nothing: on error neither the record nor
/// the dispenser row may have changed.
#[async_trait]
pub trait DispenserStore: Send + Sync + std::fmt::Debug {
    /// Persists a new closed dispenser and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::PersistenceError`] on storage failure.
    async fn insert_dispenser(&self, rates: DispenserRates) -> Result<Dispenser, DispenserError>;

    /// Creates an in-progress usage record and marks the dispenser open.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::DispenserNotFound`] or
    /// [`DispenserError::AlreadyOpen`] if the stored state disagrees, or
    /// [`DispenserError::PersistenceError`] on storage failure.
    async fn open_session(
        &self,
        dispenser_id: DispenserId,
        start_time: DateTime<Utc>,
    ) -> Result<UsageRecord, DispenserError>;

    /// Finalizes the pending record and marks the dispenser closed.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::DispenserNotFound`],
    /// [`DispenserError::AlreadyClosed`] or
    /// [`DispenserError::InternalInconsistency`] if the stored state
    /// disagrees, or [`DispenserError::PersistenceError`] on storage
    /// failure.
    async fn close_session(
        &self,
        dispenser_id: DispenserId,
        pending: &PendingClose,
    ) -> Result<(), DispenserError>;

    /// Loads one dispenser with its records.
    ///
    /// Used to resynchronize the registry when the stored state has moved
    /// on, e.g. after another gateway instance sharing the store changed it.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::PersistenceError`] on storage failure.
    async fn load_dispenser(
        &self,
        dispenser_id: DispenserId,
    ) -> Result<Option<DispenserEntry>, DispenserError>;

    /// Loads every dispenser with its records, ordered by dispenser id.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::PersistenceError`] on storage failure.
    async fn load_dispensers(&self) -> Result<Vec<DispenserEntry>, DispenserError>;

    /// Looks up an administrator by username.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::PersistenceError`] on storage failure.
    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, DispenserError>;

    /// Persists a new administrator.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::InvalidRequest`] if the username is taken,
    /// or [`DispenserError::PersistenceError`] on storage failure.
    async fn insert_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Admin, DispenserError>;
}
