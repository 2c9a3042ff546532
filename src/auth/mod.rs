//! Administrator authentication: bcrypt password hashes, JWT access tokens,
//! and the middleware guarding admin-only routes.

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{AdminIdentity, JwtConfig};
pub use middleware::require_admin;
