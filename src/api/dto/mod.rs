//! Data Transfer Objects for REST request/response serialization.
//!
//! Timestamps are rendered as `YYYY-MM-DD HH:MM:SS` in UTC.

pub mod auth_dto;
pub mod common_dto;
pub mod dispenser_dto;
pub mod statistics_dto;

pub use auth_dto::*;
pub use common_dto::*;
pub use dispenser_dto::*;
pub use statistics_dto::*;
