//! gRPC server module for the rate limit service.

pub mod messages;
mod server;
mod service;

pub use server::GrpcServer;
pub use service::RateLimitServiceImpl;

// Service glue generated by build.rs
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/ttskit.ratelimit.v1.RateLimitService.rs"));
}

// Re-export commonly used types
pub use proto::rate_limit_service_client::RateLimitServiceClient;
pub use proto::rate_limit_service_server::RateLimitServiceServer;
