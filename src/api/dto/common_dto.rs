//! Shared DTO types used across multiple endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Wire format of every timestamp in API responses (UTC, no offset).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

impl MessageResponse {
    /// Wraps a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
