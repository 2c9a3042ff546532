//! Login DTOs.

use serde::{Deserialize, Serialize};

/// Request body for `POST /auth/login`.
#[derive(Deserialize)]
pub struct LoginRequest {
    /// Admin username.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Response body for a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Signed JWT to send as `Authorization: Bearer <token>`.
    pub access_token: String,
}
