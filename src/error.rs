//! Error types for the rate limiting service.

use thiserror::Error;

/// Main error type for rate limiter operations.
#[derive(Error, Debug)]
pub enum LimiterError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared store I/O errors (connection refused, timeouts, bad replies)
    #[error("Store error: {0}")]
    Store(String),

    /// Raised by enforcing callers when an identity is denied
    #[error("{message}")]
    RateLimited {
        identity: String,
        message: String,
        retry_after_secs: u64,
    },

    /// gRPC server errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for LimiterError {
    fn from(err: redis::RedisError) -> Self {
        LimiterError::Store(err.to_string())
    }
}

impl From<::config::ConfigError> for LimiterError {
    fn from(err: ::config::ConfigError) -> Self {
        LimiterError::Config(err.to_string())
    }
}

impl From<LimiterError> for tonic::Status {
    fn from(err: LimiterError) -> Self {
        match err {
            LimiterError::RateLimited {
                message,
                retry_after_secs,
                ..
            } => {
                let mut status = tonic::Status::resource_exhausted(message);
                status
                    .metadata_mut()
                    .insert("retry-after", retry_after_secs.into());
                status
            }
            LimiterError::Store(msg) => tonic::Status::unavailable(msg),
            LimiterError::Config(msg) => tonic::Status::failed_precondition(msg),
            other => tonic::Status::internal(other.to_string()),
        }
    }
}

/// Result type alias for rate limiter operations.
pub type Result<T> = std::result::Result<T, LimiterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_maps_to_resource_exhausted() {
        let err = LimiterError::RateLimited {
            identity: "10.0.0.1".to_string(),
            message: "Rate limit exceeded. Try again in 42 seconds.".to_string(),
            retry_after_secs: 42,
        };
        assert_eq!(err.to_string(), "Rate limit exceeded. Try again in 42 seconds.");

        let status = tonic::Status::from(err);
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);
        assert_eq!(
            status.metadata().get("retry-after").unwrap().to_str().unwrap(),
            "42"
        );
    }

    #[test]
    fn test_store_error_maps_to_unavailable() {
        let status = tonic::Status::from(LimiterError::Store("connection refused".into()));
        assert_eq!(status.code(), tonic::Code::Unavailable);
        assert_eq!(status.message(), "connection refused");
    }
}
