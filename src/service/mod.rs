//! Service layer: business logic orchestration.
//!
//! [`DispenserService`] coordinates registration, metering and statistics
//! between the in-process registry and the durable store.
//! [`AuthService`] handles administrator login and token verification.

pub mod auth_service;
pub mod dispenser_service;

pub use auth_service::AuthService;
pub use dispenser_service::DispenserService;
