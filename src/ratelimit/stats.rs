//! Decision and reporting types shared by all limiter backends.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use super::record::LimiterConfig;

/// Outcome of a single admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Human-readable explanation
    pub message: String,
    /// Admissions left in the current window
    pub remaining: u64,
    /// How long a denied caller should wait before retrying
    #[serde(with = "opt_secs")]
    pub retry_after: Option<Duration>,
}

impl Decision {
    /// An admitted request with `remaining` admissions left.
    pub fn admit(remaining: u64) -> Self {
        Self {
            allowed: true,
            message: format!(
                "Request allowed. {} requests remaining in this window.",
                remaining
            ),
            remaining,
            retry_after: None,
        }
    }

    /// Denial for an identity that was already blocked.
    pub fn still_blocked(remaining_block: Duration) -> Self {
        Self {
            allowed: false,
            message: format!(
                "Rate limit exceeded. Try again in {} seconds.",
                remaining_block.as_secs()
            ),
            remaining: 0,
            retry_after: Some(remaining_block),
        }
    }

    /// Denial on the request that triggered a new block.
    pub fn newly_blocked(block_duration: Duration) -> Self {
        Self {
            allowed: false,
            message: format!(
                "Rate limit exceeded. Blocked for {} seconds.",
                block_duration.as_secs()
            ),
            remaining: 0,
            retry_after: Some(block_duration),
        }
    }

    /// Admission while rate limiting is switched off.
    pub fn disabled() -> Self {
        Self {
            allowed: true,
            message: "Rate limiting disabled.".to_string(),
            remaining: u64::MAX,
            retry_after: None,
        }
    }

    /// Retry hint in whole seconds, rounded up so callers never retry early.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after
            .map(|d| {
                let secs = d.as_secs();
                if d.subsec_nanos() > 0 {
                    secs + 1
                } else {
                    secs
                }
            })
            .unwrap_or(0)
    }
}

/// Per-identity statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub requests: u64,
    pub remaining: u64,
    /// Start of the current window; unknown on the shared-store backend
    pub window_start: Option<DateTime<Utc>>,
    #[serde(serialize_with = "secs")]
    pub window_remaining: Duration,
    pub blocked: bool,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl UserStats {
    /// Stats for an identity with no requests in the current window.
    pub fn fresh(config: &LimiterConfig) -> Self {
        Self {
            requests: 0,
            remaining: config.max_requests,
            window_start: Some(Utc::now()),
            window_remaining: config.window,
            blocked: false,
            blocked_until: None,
        }
    }
}

/// Limiter-wide statistics.
///
/// User counts are `None` when the backend cannot enumerate identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalStats {
    pub total_users: Option<usize>,
    pub active_users: Option<usize>,
    pub blocked_users: Option<usize>,
    pub max_requests_per_window: u64,
    pub window_seconds: u64,
    pub block_duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GlobalStats {
    /// Only the static configuration, no user counts.
    pub fn config_only(config: &LimiterConfig) -> Self {
        Self {
            total_users: None,
            active_users: None,
            blocked_users: None,
            max_requests_per_window: config.max_requests,
            window_seconds: config.window.as_secs(),
            block_duration: config.block_duration.as_secs(),
            error: None,
        }
    }

    /// Fallback payload when the backend failed.
    pub fn from_error(error: impl ToString) -> Self {
        Self {
            total_users: None,
            active_users: None,
            blocked_users: None,
            max_requests_per_window: 0,
            window_seconds: 0,
            block_duration: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Combined admission and stats view for one identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInfo {
    pub user_id: String,
    pub rate_limited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub remaining_requests: u64,
    pub reset_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UserInfo {
    /// Info reported while rate limiting is switched off.
    pub fn disabled(user_id: &str) -> Self {
        let decision = Decision::disabled();
        Self {
            user_id: user_id.to_string(),
            rate_limited: false,
            message: Some(decision.message),
            remaining_requests: decision.remaining,
            reset_time: None,
            error: None,
        }
    }

    /// Permissive fallback used when the backend failed.
    pub fn from_error(user_id: &str, error: impl ToString) -> Self {
        Self {
            user_id: user_id.to_string(),
            rate_limited: false,
            message: None,
            remaining_requests: 0,
            reset_time: None,
            error: Some(error.to_string()),
        }
    }
}

/// Wall-clock time `offset` from now.
pub(crate) fn wall_clock_after(offset: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(offset).unwrap_or(chrono::Duration::zero())
}

/// Wall-clock time `offset` ago.
pub(crate) fn wall_clock_before(offset: Duration) -> DateTime<Utc> {
    Utc::now() - chrono::Duration::from_std(offset).unwrap_or(chrono::Duration::zero())
}

fn secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

mod opt_secs {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_messages() {
        let d = Decision::admit(3);
        assert!(d.allowed);
        assert_eq!(d.message, "Request allowed. 3 requests remaining in this window.");
        assert_eq!(d.retry_after_secs(), 0);

        let d = Decision::newly_blocked(Duration::from_secs(60));
        assert!(!d.allowed);
        assert_eq!(d.message, "Rate limit exceeded. Blocked for 60 seconds.");
        assert_eq!(d.retry_after_secs(), 60);

        let d = Decision::still_blocked(Duration::from_millis(41_200));
        assert_eq!(d.message, "Rate limit exceeded. Try again in 41 seconds.");
        assert_eq!(d.retry_after_secs(), 42);
    }

    #[test]
    fn test_global_stats_serializes_null_counts() {
        let stats = GlobalStats::config_only(&LimiterConfig::new(5, 60, 120));
        let json = serde_json::to_value(&stats).unwrap();

        assert!(json["total_users"].is_null());
        assert_eq!(json["max_requests_per_window"], 5);
        assert_eq!(json["block_duration"], 120);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_user_info_error_fallback() {
        let info = UserInfo::from_error("u1", "boom");
        assert!(!info.rate_limited);
        assert_eq!(info.remaining_requests, 0);
        assert_eq!(info.reset_time, None);
        assert_eq!(info.error.as_deref(), Some("boom"));
    }
}
