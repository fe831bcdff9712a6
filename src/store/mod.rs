//! Shared key-value stores for multi-process rate limiting.
//!
//! The shared-store limiter only needs a handful of atomic primitives:
//! counters with expiry, expiring flags, TTL lookups and deletes.
//!
//! - **Memory**: process-local store, for tests and embedded single-process use
//! - **Redis**: the store shared by every API and bot process

mod memory;
#[cfg(feature = "redis-backend")]
mod redis_store;

pub use memory::MemoryStore;
#[cfg(feature = "redis-backend")]
pub use redis_store::RedisStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Atomic key-value primitives used by the shared-store rate limiter.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Whether `key` exists (and has not expired).
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remaining time to live; `None` if the key is missing or never expires.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Current integer value of `key`, 0 when missing.
    async fn get_count(&self, key: &str) -> Result<u64>;

    /// Atomically increment `key` and (re)set its expiry to `ttl`.
    ///
    /// Returns the value after the increment.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<u64>;

    /// Set `key` to `value`, expiring after `ttl`.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Delete every key in `keys`; missing keys are ignored.
    async fn delete(&self, keys: &[&str]) -> Result<()>;

    /// Get store name for logging.
    fn store_name(&self) -> &'static str;
}
