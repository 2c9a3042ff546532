//! Access token issuance and verification (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::Admin;
use crate::error::DispenserError;

/// Issuer claim stamped on every token.
pub const TOKEN_ISSUER: &str = "dispenser-gateway";

/// JWT signing configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Token lifetime in hours.
    pub expiration_hours: i64,
    /// Issuer claim.
    pub issuer: String,
}

impl JwtConfig {
    /// Creates a config with the default issuer.
    #[must_use]
    pub fn new(secret: impl Into<String>, expiration_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours,
            issuer: TOKEN_ISSUER.to_string(),
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("expiration_hours", &self.expiration_hours)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the admin id.
    pub sub: String,
    /// Admin username.
    pub username: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Issuer.
    pub iss: String,
}

impl TokenClaims {
    /// Builds claims for `admin` valid for the configured lifetime.
    #[must_use]
    pub fn for_admin(admin: &Admin, config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(config.expiration_hours);
        Self {
            sub: admin.id.to_string(),
            username: admin.username.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }
}

/// Identity of the administrator behind a verified token.
///
/// Inserted into request extensions by
/// [`super::middleware::require_admin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    /// Admin id.
    pub admin_id: i64,
    /// Admin username.
    pub username: String,
}

/// Signs `claims` with the configured secret.
///
/// # Errors
///
/// Returns [`DispenserError::Internal`] if encoding fails.
pub fn encode_claims(claims: &TokenClaims, config: &JwtConfig) -> Result<String, DispenserError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| DispenserError::Internal(format!("token signing failed: {e}")))
}

/// Creates an access token for `admin`.
///
/// # Errors
///
/// Returns [`DispenserError::Internal`] if encoding fails.
pub fn create_token(admin: &Admin, config: &JwtConfig) -> Result<String, DispenserError> {
    encode_claims(&TokenClaims::for_admin(admin, config), config)
}

/// Verifies signature, issuer and expiry of `token` and returns the admin
/// identity it carries.
///
/// # Errors
///
/// Returns [`DispenserError::Unauthorized`] if the token is malformed,
/// forged, expired, or issued by someone else.
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<AdminIdentity, DispenserError> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| DispenserError::Unauthorized(format!("Invalid token: {e}")))?;

    let admin_id = data
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| DispenserError::Unauthorized("Invalid token subject".to_string()))?;

    Ok(AdminIdentity {
        admin_id,
        username: data.claims.username,
    })
}
