//! In-process rate limiter implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::backend::RateLimiterBackend;
use super::record::{LimiterConfig, RateLimitRecord};
use super::stats::{wall_clock_after, wall_clock_before, Decision, GlobalStats, UserStats};
use crate::error::Result;

/// The in-process rate limiter.
///
/// Records live in one map behind a single async mutex, so every check is
/// serialized within the process. Only valid for single-process deployments.
pub struct RateLimiter {
    /// Rate limit records indexed by identity
    records: Mutex<HashMap<String, RateLimitRecord>>,
    config: LimiterConfig,
}

impl RateLimiter {
    /// Create a new rate limiter with default settings.
    pub fn new() -> Self {
        Self::with_config(LimiterConfig::default())
    }

    /// Create a new rate limiter with the given configuration.
    pub fn with_config(config: LimiterConfig) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Number of records currently held.
    pub async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimiterBackend for RateLimiter {
    async fn is_allowed(&self, identity: &str) -> Result<Decision> {
        let mut records = self.records.lock().await;
        let now = Instant::now();

        let record = records
            .entry(identity.to_string())
            .or_insert_with(|| RateLimitRecord::new(now));

        if record.is_blocked(now) {
            let remaining = record.block_remaining(now);
            trace!(identity = %identity, remaining_secs = remaining.as_secs(), "Identity still blocked");
            return Ok(Decision::still_blocked(remaining));
        }

        if record.window_expired(now, self.config.window) {
            record.reset_window(now);
        }

        if record.request_count >= self.config.max_requests {
            record.blocked_until = Some(now + self.config.block_duration);
            debug!(
                identity = %identity,
                count = record.request_count,
                limit = self.config.max_requests,
                block_secs = self.config.block_duration.as_secs(),
                "Rate limit exceeded, blocking identity"
            );
            return Ok(Decision::newly_blocked(self.config.block_duration));
        }

        record.request_count += 1;
        let remaining = self.config.max_requests - record.request_count;
        trace!(identity = %identity, remaining = remaining, "Request allowed");
        Ok(Decision::admit(remaining))
    }

    async fn get_user_stats(&self, identity: &str) -> Result<UserStats> {
        let records = self.records.lock().await;
        let now = Instant::now();

        let record = match records.get(identity) {
            Some(record) if !record.window_expired(now, self.config.window) => record,
            _ => return Ok(UserStats::fresh(&self.config)),
        };

        let blocked = record.is_blocked(now);
        Ok(UserStats {
            requests: record.request_count,
            remaining: self.config.max_requests.saturating_sub(record.request_count),
            window_start: Some(wall_clock_before(now.saturating_duration_since(record.window_start))),
            window_remaining: record.window_remaining(now, self.config.window),
            blocked,
            blocked_until: blocked.then(|| wall_clock_after(record.block_remaining(now))),
        })
    }

    async fn reset_user(&self, identity: &str) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.remove(identity).is_some() {
            debug!(identity = %identity, "Rate limit record reset");
        }
        Ok(())
    }

    async fn get_global_stats(&self) -> Result<GlobalStats> {
        let mut records = self.records.lock().await;
        let now = Instant::now();
        let window = self.config.window;

        let before = records.len();
        records.retain(|_, record| !record.is_stale(now, window));
        let pruned = before - records.len();
        if pruned > 0 {
            trace!(pruned = pruned, "Pruned stale rate limit records");
        }

        let total_users = records.len();
        let blocked_users = records.values().filter(|r| r.is_blocked(now)).count();

        Ok(GlobalStats {
            total_users: Some(total_users),
            active_users: Some(total_users - blocked_users),
            blocked_users: Some(blocked_users),
            ..GlobalStats::config_only(&self.config)
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn limiter(max_requests: u64, window_secs: u64, block_secs: u64) -> RateLimiter {
        RateLimiter::with_config(LimiterConfig::new(max_requests, window_secs, block_secs))
    }

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.record_count().await, 0);
        assert_eq!(limiter.get_user_stats("u1").await.unwrap().remaining, 10);
    }

    #[tokio::test]
    async fn test_first_n_allowed_then_blocked() {
        let limiter = limiter(3, 60, 60);

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.is_allowed("u1").await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let decision = limiter.is_allowed("u1").await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after, Some(Duration::from_secs(60)));

        let stats = limiter.get_user_stats("u1").await.unwrap();
        assert!(stats.blocked);
        assert!(stats.blocked_until.is_some());
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.remaining, 0);
    }

    #[tokio::test]
    async fn test_scenario_two_requests_then_blocked_for_60() {
        let limiter = limiter(2, 60, 60);

        assert!(limiter.is_allowed("u1").await.unwrap().allowed);
        assert!(limiter.is_allowed("u1").await.unwrap().allowed);

        let decision = limiter.is_allowed("u1").await.unwrap();
        assert!(!decision.allowed);
        assert!(decision.message.contains("Blocked for 60 seconds"));
    }

    #[tokio::test]
    async fn test_blocked_denial_does_not_count() {
        let limiter = limiter(1, 60, 30);

        limiter.is_allowed("u1").await.unwrap();
        limiter.is_allowed("u1").await.unwrap();

        let decision = limiter.is_allowed("u1").await.unwrap();
        assert!(!decision.allowed);
        assert!(decision.message.starts_with("Rate limit exceeded. Try again in"));

        let stats = limiter.get_user_stats("u1").await.unwrap();
        assert_eq!(stats.requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_outlasts_window() {
        let limiter = limiter(1, 10, 60);

        assert!(limiter.is_allowed("u1").await.unwrap().allowed);
        assert!(!limiter.is_allowed("u1").await.unwrap().allowed);

        // Window has long expired but the block is still active
        tokio::time::advance(Duration::from_secs(30)).await;
        let decision = limiter.is_allowed("u1").await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.message, "Rate limit exceeded. Try again in 30 seconds.");

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(limiter.is_allowed("u1").await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_block_cleared_by_time() {
        let limiter = limiter(1, 1, 1);

        assert!(limiter.is_allowed("u1").await.unwrap().allowed);
        assert!(!limiter.is_allowed("u1").await.unwrap().allowed);

        tokio::time::advance(Duration::from_millis(1100)).await;

        let decision = limiter.is_allowed("u1").await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reset_reports_fresh_stats() {
        let limiter = limiter(5, 10, 60);

        limiter.is_allowed("u1").await.unwrap();
        limiter.is_allowed("u1").await.unwrap();
        assert_eq!(limiter.get_user_stats("u1").await.unwrap().requests, 2);

        tokio::time::advance(Duration::from_secs(10)).await;

        let stats = limiter.get_user_stats("u1").await.unwrap();
        assert_eq!(stats.requests, 0);
        assert_eq!(stats.remaining, 5);
        assert!(!stats.blocked);
        // Reporting does not mutate the stored record
        assert_eq!(limiter.record_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_block_not_reported_within_window() {
        let limiter = limiter(1, 60, 10);

        limiter.is_allowed("u1").await.unwrap();
        assert!(!limiter.is_allowed("u1").await.unwrap().allowed);
        assert!(limiter.get_user_stats("u1").await.unwrap().blocked_until.is_some());

        // Block is over, window still open
        tokio::time::advance(Duration::from_secs(15)).await;
        let stats = limiter.get_user_stats("u1").await.unwrap();
        assert!(!stats.blocked);
        assert_eq!(stats.blocked_until, None);
        assert_eq!(stats.requests, 1);
    }

    #[tokio::test]
    async fn test_untouched_identity_stats() {
        let limiter = limiter(7, 60, 60);

        let stats = limiter.get_user_stats("newuser").await.unwrap();
        assert_eq!(stats.requests, 0);
        assert_eq!(stats.remaining, 7);
        assert!(!stats.blocked);
        assert_eq!(stats.blocked_until, None);
        assert_eq!(limiter.record_count().await, 0);
    }

    #[tokio::test]
    async fn test_reset_behaves_like_new_identity() {
        let limiter = limiter(2, 60, 60);

        for _ in 0..3 {
            limiter.is_allowed("u1").await.unwrap();
        }
        limiter.reset_user("u1").await.unwrap();
        assert_eq!(limiter.record_count().await, 0);

        let after_reset = limiter.is_allowed("u1").await.unwrap();
        let never_seen = limiter.is_allowed("u2").await.unwrap();
        assert_eq!(after_reset, never_seen);

        // Resetting an unknown identity is a no-op
        limiter.reset_user("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_identities_are_isolated() {
        let limiter = limiter(1, 60, 60);

        limiter.is_allowed("a").await.unwrap();
        assert!(!limiter.is_allowed("a").await.unwrap().allowed);

        let b = limiter.is_allowed("b").await.unwrap();
        assert!(b.allowed);
        assert!(!limiter.get_user_stats("b").await.unwrap().blocked);
    }

    #[tokio::test]
    async fn test_empty_identity_is_a_valid_key() {
        let limiter = limiter(1, 60, 60);

        assert!(limiter.is_allowed("").await.unwrap().allowed);
        assert!(!limiter.is_allowed("").await.unwrap().allowed);
        assert!(limiter.is_allowed("other").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_global_stats_counts_users() {
        let limiter = limiter(1, 60, 45);

        limiter.is_allowed("u1").await.unwrap();
        limiter.is_allowed("u2").await.unwrap();

        let stats = limiter.get_global_stats().await.unwrap();
        assert_eq!(stats.total_users, Some(2));
        assert_eq!(stats.active_users, Some(2));
        assert_eq!(stats.blocked_users, Some(0));
        assert_eq!(stats.max_requests_per_window, 1);
        assert_eq!(stats.window_seconds, 60);
        assert_eq!(stats.block_duration, 45);

        limiter.is_allowed("u2").await.unwrap();
        let stats = limiter.get_global_stats().await.unwrap();
        assert_eq!(stats.active_users, Some(1));
        assert_eq!(stats.blocked_users, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_stats_prunes_stale_records() {
        let limiter = limiter(1, 10, 60);

        limiter.is_allowed("idle").await.unwrap();
        limiter.is_allowed("blocked").await.unwrap();
        limiter.is_allowed("blocked").await.unwrap();

        tokio::time::advance(Duration::from_secs(15)).await;

        let stats = limiter.get_global_stats().await.unwrap();
        assert_eq!(stats.total_users, Some(1));
        assert_eq!(stats.blocked_users, Some(1));
        assert_eq!(limiter.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_user_info_counts_as_request() {
        let limiter = limiter(2, 60, 60);

        let info = limiter.get_user_info("u1").await;
        assert_eq!(info.user_id, "u1");
        assert!(!info.rate_limited);
        assert_eq!(info.remaining_requests, 1);
        assert_eq!(info.error, None);

        limiter.get_user_info("u1").await;
        let info = limiter.get_user_info("u1").await;
        assert!(info.rate_limited);
        assert!(info.reset_time.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_checks_are_exact() {
        let limiter = Arc::new(limiter(50, 60, 60));

        let checks = (0..80).map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.is_allowed("shared").await.unwrap().allowed })
        });
        let results = futures::future::join_all(checks).await;

        let admitted = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
        assert_eq!(admitted, 50);
    }
}
