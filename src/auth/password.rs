//! Password hashing utilities.

use crate::error::DispenserError;

/// Hashes a password with bcrypt at the given work factor.
///
/// # Errors
///
/// Returns [`DispenserError::Internal`] if the cost is out of range or
/// hashing fails.
pub fn hash_password(password: &str, cost: u32) -> Result<String, DispenserError> {
    bcrypt::hash(password, cost)
        .map_err(|e| DispenserError::Internal(format!("password hashing failed: {e}")))
}

/// Checks a password against a bcrypt hash.
///
/// A malformed hash counts as a mismatch.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
