//! TTSKit rate limiting service
//!
//! Per-identity admission control for the TTSKit API and Telegram bot. An
//! in-process limiter serves single-process deployments; a Redis-backed
//! limiter enforces one logical limit across processes. Both sit behind
//! the `RateLimiterBackend` trait and are exposed over gRPC.

pub mod config;
pub mod error;
pub mod grpc;
pub mod ratelimit;
pub mod store;
