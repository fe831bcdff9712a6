//! Rate limiter trait for abstracting in-process and shared-store implementations.

use async_trait::async_trait;
use tracing::warn;

use super::stats::{Decision, GlobalStats, UserInfo, UserStats};
use crate::error::Result;

/// Trait for rate limiter implementations.
///
/// This trait abstracts over both the in-process `RateLimiter` and the
/// `SharedStoreRateLimiter` so that the gRPC service and other callers
/// work with either.
#[async_trait]
pub trait RateLimiterBackend: Send + Sync {
    /// Decide whether `identity` may make a request now, updating its state.
    async fn is_allowed(&self, identity: &str) -> Result<Decision>;

    /// Read the current window state for `identity`.
    async fn get_user_stats(&self, identity: &str) -> Result<UserStats>;

    /// Forget all state for `identity`.
    async fn reset_user(&self, identity: &str) -> Result<()>;

    /// Limiter-wide statistics.
    async fn get_global_stats(&self) -> Result<GlobalStats>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Admission check plus stats in one view.
    ///
    /// This counts as a request. Failures are absorbed into a permissive
    /// payload with `error` set.
    async fn get_user_info(&self, identity: &str) -> UserInfo {
        let result = async {
            let decision = self.is_allowed(identity).await?;
            let stats = self.get_user_stats(identity).await?;
            Ok::<_, crate::error::LimiterError>(UserInfo {
                user_id: identity.to_string(),
                rate_limited: !decision.allowed,
                message: Some(decision.message),
                remaining_requests: stats.remaining,
                reset_time: stats.blocked_until,
                error: None,
            })
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!(
                identity = %identity,
                backend = self.backend_name(),
                error = %e,
                "Failed to collect rate limit info"
            );
            UserInfo::from_error(identity, e)
        })
    }
}
