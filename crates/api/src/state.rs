//! Shared application state.

use std::sync::Arc;

use document_store::DocumentStore;
use domain::{AccountService, CatalogService, OrderService, PasswordHasher, RiderService};

use crate::auth::{Argon2Hasher, TokenService};
use crate::config::Config;

/// Services and token keys shared by every handler.
pub struct AppState<S: DocumentStore> {
    pub catalog: CatalogService<S>,
    pub accounts: AccountService<S>,
    pub orders: OrderService<S>,
    pub riders: RiderService<S>,
    pub tokens: TokenService,
}

impl<S: DocumentStore + Clone> AppState<S> {
    /// Builds every service over one store.
    pub fn new(store: S, tokens: TokenService, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            accounts: AccountService::new(store.clone(), Arc::clone(&hasher)),
            orders: OrderService::new(store.clone()),
            riders: RiderService::new(store, hasher),
            tokens,
        }
    }
}

/// Creates the application state from configuration, hashing with Argon2.
pub fn create_state<S: DocumentStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_hours);
    Arc::new(AppState::new(store, tokens, Arc::new(Argon2Hasher)))
}
