use std::sync::Arc;

use db::DBService;
use services::services::{
    config::WebhookGuardConfig, idempotency::IdempotencyCache, rate_limit::RateLimiter,
    vault::CredentialVault,
};

pub mod error;
pub mod http;
pub mod routes;

/// Shared state behind every request handler. The rate limiter and the
/// idempotency cache are the only cross-request mutable pieces; both are
/// internally synchronized.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    vault: CredentialVault,
    rate_limiter: Arc<RateLimiter>,
    idempotency: Arc<IdempotencyCache>,
}

impl AppState {
    pub fn new(db: DBService, vault: CredentialVault, config: &WebhookGuardConfig) -> Self {
        Self {
            db,
            vault,
            rate_limiter: Arc::new(RateLimiter::new(
                config.rate_limit_max,
                config.rate_limit_window,
            )),
            idempotency: Arc::new(IdempotencyCache::new(config.idempotency_ttl)),
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn idempotency(&self) -> &IdempotencyCache {
        &self.idempotency
    }
}
