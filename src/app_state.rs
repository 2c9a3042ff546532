//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::JwtConfig;
use crate::domain::DispenserRegistry;
use crate::persistence::DispenserStore;
use crate::service::{AuthService, DispenserService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Dispenser service for all metering logic.
    pub dispenser_service: Arc<DispenserService>,
    /// Auth service for login and the admin guard.
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    /// Wires both services on top of one store with an empty registry.
    #[must_use]
    pub fn new(store: Arc<dyn DispenserStore>, jwt: JwtConfig, bcrypt_cost: u32) -> Self {
        let registry = Arc::new(DispenserRegistry::new());
        Self {
            dispenser_service: Arc::new(DispenserService::new(registry, Arc::clone(&store))),
            auth_service: Arc::new(AuthService::new(store, jwt, bcrypt_cost)),
        }
    }
}
