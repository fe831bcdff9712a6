//! In-memory shared store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::SharedStore;
use crate::error::{LimiterError, Result};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// A process-local store with per-key expiry.
///
/// Mirrors the subset of Redis semantics the shared-store limiter relies on.
/// Expired keys are dropped lazily when touched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_entry<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        Ok(Self::live_entry(&mut entries, key, Instant::now()).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        Ok(Self::live_entry(&mut entries, key, now)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn get_count(&self, key: &str) -> Result<u64> {
        let mut entries = self.entries.lock();
        match Self::live_entry(&mut entries, key, Instant::now()) {
            Some(entry) => entry
                .value
                .parse()
                .map_err(|_| LimiterError::Store(format!("value at {} is not an integer", key))),
            None => Ok(0),
        }
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<u64> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let current: u64 = match Self::live_entry(&mut entries, key, now) {
            Some(entry) => entry
                .value
                .parse()
                .map_err(|_| LimiterError::Store(format!("value at {} is not an integer", key)))?,
            None => 0,
        };
        let next = current + 1;

        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(next)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.lock();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
