use std::{env, time::Duration};

use tracing::warn;

const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_IDEMPOTENCY_TTL_SECS: u64 = 86400;
const DEFAULT_IDEMPOTENCY_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Tunables for the in-process webhook guards (rate limiter + idempotency
/// cache). All knobs are env-overridable; invalid values fall back to the
/// defaults with a warning rather than refusing to boot.
#[derive(Debug, Clone)]
pub struct WebhookGuardConfig {
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub idempotency_ttl: Duration,
    pub idempotency_sweep_interval: Duration,
}

impl Default for WebhookGuardConfig {
    fn default() -> Self {
        Self {
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            idempotency_ttl: Duration::from_secs(DEFAULT_IDEMPOTENCY_TTL_SECS),
            idempotency_sweep_interval: Duration::from_secs(
                DEFAULT_IDEMPOTENCY_SWEEP_INTERVAL_SECS,
            ),
        }
    }
}

impl WebhookGuardConfig {
    pub fn from_env() -> Self {
        Self::from_env_with(|name| env::var(name).ok())
    }

    fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            rate_limit_max: read_env_u32(
                "POS_WEBHOOK_RATE_LIMIT_MAX",
                defaults.rate_limit_max,
                &get_env,
            ),
            rate_limit_window: read_env_duration(
                "POS_WEBHOOK_RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit_window,
                &get_env,
            ),
            idempotency_ttl: read_env_duration(
                "POS_IDEMPOTENCY_TTL_SECS",
                defaults.idempotency_ttl,
                &get_env,
            ),
            idempotency_sweep_interval: read_env_duration(
                "POS_IDEMPOTENCY_SWEEP_INTERVAL_SECS",
                defaults.idempotency_sweep_interval,
                &get_env,
            ),
        }
    }
}

fn read_env_u32<F>(name: &str, default: u32, get_env: &F) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(name) else {
        return default;
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => value,
        Ok(_) => {
            warn!("{name} must be positive; using default {default}");
            default
        }
        Err(err) => {
            warn!(value = raw.as_str(), error = %err, "Invalid {name}; using default");
            default
        }
    }
}

fn read_env_duration<F>(name: &str, default: Duration, get_env: &F) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(name) else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        Ok(_) => {
            warn!("{name} must be positive; using default {:?}", default);
            default
        }
        Err(err) => {
            warn!(value = raw.as_str(), error = %err, "Invalid {name}; using default");
            default
        }
    }
}
