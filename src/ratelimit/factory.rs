//! Backend selection and the process-wide limiter handle.

use std::sync::Arc;
use tracing::{info, warn};

use super::backend::RateLimiterBackend;
use super::limiter::RateLimiter;
use super::record::LimiterConfig;
use super::stats::{Decision, GlobalStats, UserInfo, UserStats};
use crate::config::RateLimitingConfig;
use crate::error::{LimiterError, Result};

/// Build the limiter backend for this process.
///
/// The shared-store backend is chosen only when rate limiting is enabled, a
/// Redis URL is configured and the `redis-backend` feature is compiled in.
/// Any failure to reach the store falls back to the in-process backend.
pub async fn build_rate_limiter(settings: &RateLimitingConfig) -> Arc<dyn RateLimiterBackend> {
    let config = LimiterConfig::from(settings);

    if settings.enabled {
        if let Some(url) = settings.redis_url.as_deref() {
            match connect_shared(url, config).await {
                Ok(Some(limiter)) => {
                    info!(
                        backend = limiter.backend_name(),
                        max_requests = config.max_requests,
                        window_secs = config.window.as_secs(),
                        "Using shared-store rate limiter"
                    );
                    return limiter;
                }
                Ok(None) => {
                    warn!("Redis URL configured but redis support is not compiled in, using in-memory rate limiter");
                }
                Err(e) => {
                    warn!(error = %e, "Shared-store rate limiter initialization failed, falling back to in-memory");
                }
            }
        }
    }

    info!(
        max_requests = config.max_requests,
        window_secs = config.window.as_secs(),
        block_secs = config.block_duration.as_secs(),
        "Using in-memory rate limiter"
    );
    Arc::new(RateLimiter::with_config(config))
}

#[cfg(feature = "redis-backend")]
async fn connect_shared(
    url: &str,
    config: LimiterConfig,
) -> Result<Option<Arc<dyn RateLimiterBackend>>> {
    let store = crate::store::RedisStore::connect(url).await?;
    let limiter: Arc<dyn RateLimiterBackend> = Arc::new(
        super::shared::SharedStoreRateLimiter::new(Arc::new(store), config),
    );
    Ok(Some(limiter))
}

#[cfg(not(feature = "redis-backend"))]
async fn connect_shared(
    _url: &str,
    _config: LimiterConfig,
) -> Result<Option<Arc<dyn RateLimiterBackend>>> {
    Ok(None)
}

/// Cloneable handle to the process limiter, injected into every consumer.
///
/// When rate limiting is disabled the handle admits everything without
/// consulting the backend.
#[derive(Clone)]
pub struct RateLimitHandle {
    backend: Arc<dyn RateLimiterBackend>,
    enabled: bool,
}

impl RateLimitHandle {
    /// Wrap an already-built backend.
    pub fn new(backend: Arc<dyn RateLimiterBackend>, enabled: bool) -> Self {
        Self { backend, enabled }
    }

    /// Build the backend from settings and wrap it.
    pub async fn from_settings(settings: &RateLimitingConfig) -> Self {
        Self::new(build_rate_limiter(settings).await, settings.enabled)
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn RateLimiterBackend> {
        &self.backend
    }

    /// Whether admission checks are enforced.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Admission check for `identity`.
    pub async fn check(&self, identity: &str) -> Result<Decision> {
        if !self.enabled {
            return Ok(Decision::disabled());
        }
        self.backend.is_allowed(identity).await
    }

    /// Admission check that turns a denial into `LimiterError::RateLimited`.
    pub async fn enforce(&self, identity: &str) -> Result<Decision> {
        let decision = self.check(identity).await?;
        if decision.allowed {
            return Ok(decision);
        }
        Err(LimiterError::RateLimited {
            identity: identity.to_string(),
            retry_after_secs: decision.retry_after_secs(),
            message: decision.message,
        })
    }

    /// Whether `identity` is denied right now. Counts as a request.
    pub async fn is_rate_limited(&self, identity: &str) -> Result<bool> {
        Ok(!self.check(identity).await?.allowed)
    }

    pub async fn user_stats(&self, identity: &str) -> Result<UserStats> {
        self.backend.get_user_stats(identity).await
    }

    pub async fn reset(&self, identity: &str) -> Result<()> {
        self.backend.reset_user(identity).await
    }

    /// Global stats; never fails.
    pub async fn global_stats(&self) -> GlobalStats {
        match self.backend.get_global_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Failed to collect global rate limit stats");
                GlobalStats::from_error(e)
            }
        }
    }

    /// Per-identity info; never fails.
    pub async fn user_info(&self, identity: &str) -> UserInfo {
        if !self.enabled {
            return UserInfo::disabled(identity);
        }
        self.backend.get_user_info(identity).await
    }
}

impl std::fmt::Debug for RateLimitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitHandle")
            .field("backend", &self.backend.backend_name())
            .field("enabled", &self.enabled)
            .finish()
    }
}
