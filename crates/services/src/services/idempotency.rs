use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Response cache that short-circuits redelivered webhooks.
///
/// Keys derive from payload content (see `payload::idempotency_key`); values
/// are the exact envelope the first delivery produced, replayed verbatim on a
/// hit. Only successful outcomes ever get stored; failures must stay
/// retryable. Entries expire after the retention window; `sweep` runs from a
/// background task to bound memory.
pub struct IdempotencyCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedEntry>>,
}

#[derive(Debug, Clone)]
struct CachedEntry {
    response: serde_json::Value,
    stored_at: Instant,
}

impl IdempotencyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<serde_json::Value> {
        self.lookup_at(key, Instant::now())
    }

    fn lookup_at(&self, key: &str, now: Instant) -> Option<serde_json::Value> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        match entries.get(key) {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                Some(entry.response.clone())
            }
            Some(_) => {
                // Expired but not yet swept; drop it eagerly.
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn store(&self, key: String, response: serde_json::Value) {
        self.store_at(key, response, Instant::now());
    }

    fn store_at(&self, key: String, response: serde_json::Value, now: Instant) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        entries.insert(
            key,
            CachedEntry {
                response,
                stored_at: now,
            },
        );
    }

    /// Evict entries past the retention window; returns how many were
    /// removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.stored_at) < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
