//! Per-identity rate limit record.

use std::time::Duration;
use tokio::time::Instant;

/// Immutable limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Admissions allowed per window
    pub max_requests: u64,
    /// Length of the counting window
    pub window: Duration,
    /// Penalty once the limit is exceeded within a window
    pub block_duration: Duration,
}

impl LimiterConfig {
    /// Create a config from whole seconds.
    pub fn new(max_requests: u64, window_secs: u64, block_duration_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            block_duration: Duration::from_secs(block_duration_secs),
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::new(10, 60, 60)
    }
}

impl From<&crate::config::RateLimitingConfig> for LimiterConfig {
    fn from(cfg: &crate::config::RateLimitingConfig) -> Self {
        Self::new(cfg.max_requests, cfg.window_secs, cfg.block_duration_secs)
    }
}

/// Counting state for one identity in the in-process limiter.
///
/// Timestamps are monotonic; callers pass `now` so that a single check
/// observes one consistent instant.
#[derive(Debug, Clone)]
pub struct RateLimitRecord {
    /// Admitted requests in the current window
    pub request_count: u64,
    /// When the current window began
    pub window_start: Instant,
    /// Requests are denied until this instant, if set
    pub blocked_until: Option<Instant>,
}

impl RateLimitRecord {
    /// A fresh record whose window starts at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            request_count: 0,
            window_start: now,
            blocked_until: None,
        }
    }

    /// Whether a block is active at `now`.
    pub fn is_blocked(&self, now: Instant) -> bool {
        matches!(self.blocked_until, Some(until) if now < until)
    }

    /// Time left on the active block, zero if none.
    pub fn block_remaining(&self, now: Instant) -> Duration {
        self.blocked_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Whether the counting window has run its full length.
    pub fn window_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    /// Time left in the current window, zero if expired.
    pub fn window_remaining(&self, now: Instant, window: Duration) -> Duration {
        window.saturating_sub(now.saturating_duration_since(self.window_start))
    }

    /// Start a new window at `now` and clear any block.
    pub fn reset_window(&mut self, now: Instant) {
        self.request_count = 0;
        self.window_start = now;
        self.blocked_until = None;
    }

    /// Idle for a full window and not blocked: equivalent to a fresh record.
    pub fn is_stale(&self, now: Instant, window: Duration) -> bool {
        self.window_expired(now, window) && !self.is_blocked(now)
    }
}
