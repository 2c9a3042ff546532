//! Auth service: administrator login and token verification.

use std::sync::Arc;

use crate::auth::jwt::{create_token, verify_token};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AdminIdentity, JwtConfig};
use crate::domain::Admin;
use crate::error::DispenserError;
use crate::persistence::DispenserStore;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Authenticates administrators against the store and issues access tokens.
///
/// bcrypt is CPU-bound, so hashing and verification run on the blocking
/// thread pool.
#[derive(Debug, Clone)]
pub struct AuthService {
    store: Arc<dyn DispenserStore>,
    jwt: JwtConfig,
    bcrypt_cost: u32,
}

impl AuthService {
    /// Creates a new `AuthService`.
    #[must_use]
    pub fn new(store: Arc<dyn DispenserStore>, jwt: JwtConfig, bcrypt_cost: u32) -> Self {
        Self {
            store,
            jwt,
            bcrypt_cost,
        }
    }

    /// Checks a username/password pair and returns a signed access token.
    ///
    /// Unknown usernames and wrong passwords produce the same error and
    /// both pay for one bcrypt operation at the configured cost.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::Unauthorized`] on bad credentials, or a
    /// storage/internal error.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, DispenserError> {
        let Some(admin) = self.store.find_admin(username).await? else {
            tracing::debug!(username, "login for unknown admin");
            // Same bcrypt work as a wrong password so response time does not
            // reveal whether the account exists.
            let password = password.to_string();
            let cost = self.bcrypt_cost;
            let _ = tokio::task::spawn_blocking(move || hash_password(&password, cost)).await;
            return Err(DispenserError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let password = password.to_string();
        let hash = admin.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| DispenserError::Internal(format!("password check aborted: {e}")))?;
        if !matches {
            tracing::debug!(username, "login with wrong password");
            return Err(DispenserError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let token = create_token(&admin, &self.jwt)?;
        tracing::info!(admin_id = admin.id, "admin logged in");
        Ok(token)
    }

    /// Verifies an access token.
    ///
    /// # Errors
    ///
    /// Returns [`DispenserError::Unauthorized`] if the token is invalid or
    /// expired.
    pub fn authenticate(&self, token: &str) -> Result<AdminIdentity, DispenserError> {
        verify_token(token, &self.jwt)
    }

    /// Creates the administrator if no account with that username exists.
    ///
    /// An existing account is returned as is; its password is not reset.
    ///
    /// # Errors
    ///
    /// Returns a storage error, or [`DispenserError::Internal`] if hashing
    /// fails.
    pub async fn ensure_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Admin, DispenserError> {
        if let Some(existing) = self.store.find_admin(username).await? {
            tracing::info!(admin_id = existing.id, username, "admin account already present");
            return Ok(existing);
        }

        let password = password.to_string();
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| DispenserError::Internal(format!("password hashing aborted: {e}")))??;

        let admin = self.store.insert_admin(username, &hash).await?;
        tracing::info!(admin_id = admin.id, username, "admin account created");
        Ok(admin)
    }
}
