//! Domain layer: dispensers, usage records, billing, and the registry.
//!
//! This module contains the server-side domain model: identifiers, the
//! dispenser entry with its open/close state machine, the billing
//! arithmetic, statistics snapshots, and the registry providing
//! per-dispenser locking.

pub mod admin;
pub mod charge;
pub mod dispenser;
pub mod dispenser_entry;
pub mod dispenser_id;
pub mod dispenser_registry;
pub mod dispenser_stats;
pub mod usage_record;

pub use admin::Admin;
pub use charge::Charge;
pub use dispenser::{Dispenser, DispenserRates};
pub use dispenser_entry::{DispenserEntry, PendingClose};
pub use dispenser_id::{DispenserId, UsageRecordId};
pub use dispenser_registry::DispenserRegistry;
pub use dispenser_stats::{DispenserStats, RecordStats};
pub use usage_record::{RecordStatus, UsageRecord};
