pub mod config;
pub mod idempotency;
pub mod payload;
pub mod rate_limit;
pub mod reconcile;
pub mod vault;
pub mod verify;
