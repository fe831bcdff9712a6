//! Shared-store rate limiter.
//!
//! Same admission contract as the in-process limiter, with state kept in an
//! external store so that every API and bot process enforces one logical
//! limit per identity. Correctness relies on the store's atomic
//! increment-with-expiry; no local lock is taken.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

use super::backend::RateLimiterBackend;
use super::record::LimiterConfig;
use super::stats::{wall_clock_after, Decision, GlobalStats, UserStats};
use crate::error::Result;
use crate::store::SharedStore;

/// The two store keys kept per identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKeys {
    /// In-window request count, expires with the window
    pub counter: String,
    /// Present while the identity is blocked
    pub block: String,
}

impl IdentityKeys {
    /// Format: `rl:c:{identity}` and `rl:b:{identity}`
    pub fn new(identity: &str) -> Self {
        Self {
            counter: format!("rl:c:{}", identity),
            block: format!("rl:b:{}", identity),
        }
    }
}

/// A rate limiter backed by a shared key-value store.
pub struct SharedStoreRateLimiter<S: SharedStore> {
    store: Arc<S>,
    config: LimiterConfig,
}

impl<S: SharedStore> SharedStoreRateLimiter<S> {
    /// Create a new shared-store limiter.
    pub fn new(store: Arc<S>, config: LimiterConfig) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl<S: SharedStore + 'static> RateLimiterBackend for SharedStoreRateLimiter<S> {
    async fn is_allowed(&self, identity: &str) -> Result<Decision> {
        let keys = IdentityKeys::new(identity);

        if self.store.exists(&keys.block).await? {
            let ttl = self
                .store
                .ttl(&keys.block)
                .await?
                .unwrap_or(self.config.block_duration);
            trace!(identity = %identity, ttl_secs = ttl.as_secs(), "Identity still blocked");
            return Ok(Decision::still_blocked(ttl));
        }

        let count = self
            .store
            .incr_with_expiry(&keys.counter, self.config.window)
            .await?;

        if count > self.config.max_requests {
            self.store
                .set_with_expiry(&keys.block, "1", self.config.block_duration)
                .await?;
            debug!(
                identity = %identity,
                count = count,
                limit = self.config.max_requests,
                store = self.store.store_name(),
                "Shared rate limit exceeded, blocking identity"
            );
            return Ok(Decision::newly_blocked(self.config.block_duration));
        }

        Ok(Decision::admit(self.config.max_requests - count))
    }

    async fn get_user_stats(&self, identity: &str) -> Result<UserStats> {
        let keys = IdentityKeys::new(identity);

        let requests = self.store.get_count(&keys.counter).await?;
        let window_remaining = self
            .store
            .ttl(&keys.counter)
            .await?
            .unwrap_or(self.config.window);
        let blocked = self.store.exists(&keys.block).await?;
        let blocked_until = if blocked {
            self.store.ttl(&keys.block).await?.map(wall_clock_after)
        } else {
            None
        };

        Ok(UserStats {
            requests,
            remaining: self.config.max_requests.saturating_sub(requests),
            window_start: None,
            window_remaining,
            blocked,
            blocked_until,
        })
    }

    async fn reset_user(&self, identity: &str) -> Result<()> {
        let keys = IdentityKeys::new(identity);
        self.store
            .delete(&[keys.counter.as_str(), keys.block.as_str()])
            .await?;
        debug!(identity = %identity, "Shared rate limit keys reset");
        Ok(())
    }

    async fn get_global_stats(&self) -> Result<GlobalStats> {
        // Enumerating identities would need a keyspace scan.
        Ok(GlobalStats::config_only(&self.config))
    }

    fn backend_name(&self) -> &'static str {
        self.store.store_name()
    }
}
