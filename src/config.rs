//! Configuration management for the rate limiting service.

use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{LimiterError, Result};

/// Prefix for structured environment overrides, e.g.
/// `TTSKIT__RATE_LIMITING__MAX_REQUESTS=20`.
const ENV_PREFIX: &str = "TTSKIT";

/// Main configuration for the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// gRPC server address
    #[serde(default = "default_grpc_addr")]
    pub grpc_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: default_grpc_addr(),
        }
    }
}

fn default_grpc_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8081))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Feature flag; when off every request is admitted
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Admissions allowed per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Penalty in seconds once the limit is exceeded within a window
    #[serde(default = "default_block_duration_secs")]
    pub block_duration_secs: u64,

    /// Shared store connection string
    #[serde(default)]
    pub redis_url: Option<String>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            block_duration_secs: default_block_duration_secs(),
            redis_url: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_requests() -> u64 {
    10
}

fn default_window_secs() -> u64 {
    60
}

fn default_block_duration_secs() -> u64 {
    300
}

impl RateLimitingConfig {
    /// Check the configured values against the supported ranges.
    ///
    /// Ranges are only enforced while rate limiting is enabled.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if !(1..=100).contains(&self.max_requests) {
            return Err(LimiterError::Config(format!(
                "max_requests must be between 1 and 100, got {}",
                self.max_requests
            )));
        }
        if !(10..=3600).contains(&self.window_secs) {
            return Err(LimiterError::Config(format!(
                "window_secs must be between 10 and 3600, got {}",
                self.window_secs
            )));
        }
        if !(10..=3600).contains(&self.block_duration_secs) {
            return Err(LimiterError::Config(format!(
                "block_duration_secs must be between 10 and 3600, got {}",
                self.block_duration_secs
            )));
        }
        Ok(())
    }

    /// Apply the flat legacy variables (`RATE_LIMIT_REQUESTS`, `REDIS_URL`, ...).
    ///
    /// Values that fail to parse are logged and skipped.
    pub fn apply_legacy_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_u64 = |name: &str| -> Option<u64> {
            let raw = lookup(name)?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(variable = name, value = %raw, error = %e, "Ignoring unparseable legacy rate limit variable");
                    None
                }
            }
        };

        if let Some(v) = parse_u64("RATE_LIMIT_REQUESTS") {
            self.max_requests = v;
        }
        if let Some(v) = parse_u64("RATE_LIMIT_WINDOW") {
            self.window_secs = v;
        }
        if let Some(v) = parse_u64("RATE_LIMIT_BLOCK_DURATION") {
            self.block_duration_secs = v;
        }
        if let Some(raw) = lookup("ENABLE_RATE_LIMITING") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.enabled = true,
                "0" | "false" | "no" | "off" => self.enabled = false,
                _ => warn!(value = %raw, "Ignoring unparseable ENABLE_RATE_LIMITING"),
            }
        }
        if let Some(url) = lookup("REDIS_URL") {
            let url = url.trim();
            self.redis_url = if url.is_empty() { None } else { Some(url.to_string()) };
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional YAML file, and the environment.
    ///
    /// Later layers win: file, then `TTSKIT__*` variables, then the legacy
    /// flat variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None, |name| std::env::var(name).ok())
    }

    /// `env` replaces the process environment for the structured layer when set.
    fn load_from<F>(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        let mut settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        settings.rate_limiting.apply_legacy_overrides(lookup);
        settings.rate_limiting.validate()?;
        Ok(settings)
    }
}
