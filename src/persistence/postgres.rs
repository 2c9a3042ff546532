//! PostgreSQL implementation of the persistence layer.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::DispenserStore;
use super::models::{AdminRow, DispenserRow, UsageRecordRow};
use crate::config::GatewayConfig;
use crate::domain::{
    Admin, Dispenser, DispenserEntry, DispenserId, DispenserRates, PendingClose, UsageRecord,
    UsageRecordId,
};
use crate::error::DispenserError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
///
/// Session changes run inside a transaction that first takes a row lock on
/// the dispenser (`SELECT ... FOR UPDATE`), so gateways sharing one
/// database serialize their open/close calls as well.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn db_error(e: sqlx::Error) -> DispenserError {
    DispenserError::PersistenceError(e.to_string())
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool with the configured limits.
    ///
    /// # Errors
    ///
    /// Returns a [`DispenserError::PersistenceError`] if the database is
    /// unreachable.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, DispenserError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(db_error)?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`DispenserError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), DispenserError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DispenserError::PersistenceError(e.to_string()))
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DispenserStore for PostgresStore {
    async fn insert_dispenser(&self, rates: DispenserRates) -> Result<Dispenser, DispenserError> {
        let row = sqlx::query_as::<_, DispenserRow>(
            "INSERT INTO dispensers (flow_volume, price, is_open) VALUES ($1, $2, FALSE) \
             RETURNING id, flow_volume, price, is_open",
        )
        .bind(rates.flow_volume())
        .bind(rates.price())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn open_session(
        &self,
        dispenser_id: DispenserId,
        start_time: DateTime<Utc>,
    ) -> Result<UsageRecord, DispenserError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let is_open = sqlx::query_scalar::<_, bool>(
            "SELECT is_open FROM dispensers WHERE id = $1 FOR UPDATE",
        )
        .bind(dispenser_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or(DispenserError::DispenserNotFound(dispenser_id))?;

        if is_open {
            return Err(DispenserError::AlreadyOpen(dispenser_id));
        }

        let record_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO usage_records (dispenser_id, start_time) VALUES ($1, $2) RETURNING id",
        )
        .bind(dispenser_id.get())
        .bind(start_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query("UPDATE dispensers SET is_open = TRUE WHERE id = $1")
            .bind(dispenser_id.get())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(UsageRecord::started(
            UsageRecordId::new(record_id),
            dispenser_id,
            start_time,
        ))
    }

    async fn close_session(
        &self,
        dispenser_id: DispenserId,
        pending: &PendingClose,
    ) -> Result<(), DispenserError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let is_open = sqlx::query_scalar::<_, bool>(
            "SELECT is_open FROM dispensers WHERE id = $1 FOR UPDATE",
        )
        .bind(dispenser_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or(DispenserError::DispenserNotFound(dispenser_id))?;

        if !is_open {
            return Err(DispenserError::AlreadyClosed(dispenser_id));
        }

        let finalized = sqlx::query(
            "UPDATE usage_records SET end_time = $1, amount = $2, revenue = $3 \
             WHERE id = $4 AND dispenser_id = $5 AND end_time IS NULL",
        )
        .bind(pending.end_time)
        .bind(pending.charge.amount)
        .bind(pending.charge.revenue)
        .bind(pending.record_id.get())
        .bind(dispenser_id.get())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if finalized.rows_affected() != 1 {
            return Err(DispenserError::InternalInconsistency(dispenser_id));
        }

        sqlx::query("UPDATE dispensers SET is_open = FALSE WHERE id = $1")
            .bind(dispenser_id.get())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn load_dispenser(
        &self,
        dispenser_id: DispenserId,
    ) -> Result<Option<DispenserEntry>, DispenserError> {
        let Some(dispenser) = sqlx::query_as::<_, DispenserRow>(
            "SELECT id, flow_volume, price, is_open FROM dispensers WHERE id = $1",
        )
        .bind(dispenser_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        else {
            return Ok(None);
        };

        let records = sqlx::query_as::<_, UsageRecordRow>(
            "SELECT id, dispenser_id, start_time, end_time, amount, revenue \
             FROM usage_records WHERE dispenser_id = $1 ORDER BY id ASC",
        )
        .bind(dispenser_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(Some(DispenserEntry::from_parts(
            dispenser.into(),
            records.into_iter().map(UsageRecord::from).collect(),
        )))
    }

    async fn load_dispensers(&self) -> Result<Vec<DispenserEntry>, DispenserError> {
        let dispensers = sqlx::query_as::<_, DispenserRow>(
            "SELECT id, flow_volume, price, is_open FROM dispensers ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let records = sqlx::query_as::<_, UsageRecordRow>(
            "SELECT id, dispenser_id, start_time, end_time, amount, revenue \
             FROM usage_records ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut by_dispenser: BTreeMap<i64, Vec<UsageRecord>> = BTreeMap::new();
        for row in records {
            by_dispenser
                .entry(row.dispenser_id)
                .or_default()
                .push(row.into());
        }

        Ok(dispensers
            .into_iter()
            .map(|row| {
                let records = by_dispenser.remove(&row.id).unwrap_or_default();
                DispenserEntry::from_parts(row.into(), records)
            })
            .collect())
    }

    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, DispenserError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, username, password_hash FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Admin::from))
    }

    async fn insert_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Admin, DispenserError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "INSERT INTO admins (username, password_hash) VALUES ($1, $2) \
             ON CONFLICT (username) DO NOTHING \
             RETURNING id, username, password_hash",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            DispenserError::InvalidRequest(format!("admin {username} already exists"))
        })?;

        Ok(row.into())
    }
}
