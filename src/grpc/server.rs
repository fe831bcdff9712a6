//! gRPC server implementation.

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

use super::proto::rate_limit_service_server::RateLimitServiceServer;
use super::service::RateLimitServiceImpl;
use crate::error::{LimiterError, Result};
use crate::ratelimit::RateLimitHandle;

/// gRPC server for the rate limit service.
pub struct GrpcServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The process rate limiter
    limiter: RateLimitHandle,
}

impl GrpcServer {
    /// Create a new gRPC server.
    pub fn new(addr: SocketAddr, limiter: RateLimitHandle) -> Self {
        Self { addr, limiter }
    }

    /// Bind the configured address and serve until `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_on(listener, signal).await
    }

    /// Serve on an already-bound listener until `signal` resolves.
    pub async fn serve_on<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let service = RateLimitServiceImpl::new(self.limiter);

        info!(
            addr = %listener.local_addr()?,
            "Starting gRPC server for RateLimitService with graceful shutdown"
        );

        Server::builder()
            .add_service(RateLimitServiceServer::new(service))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await
            .map_err(|e| {
                error!(error = %e, "gRPC server failed");
                LimiterError::Grpc(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitingConfig;
    use crate::grpc::messages::{CheckRequest, GlobalStatsRequest, UserRequest};
    use crate::grpc::RateLimitServiceClient;

    #[tokio::test]
    async fn test_end_to_end_over_tcp() {
        let cfg = RateLimitingConfig {
            max_requests: 1,
            ..Default::default()
        };
        let handle = RateLimitHandle::from_settings(&cfg).await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(GrpcServer::new(addr, handle).serve_on(listener, async {
            let _ = rx.await;
        }));

        let mut client = RateLimitServiceClient::connect(format!("http://{}", addr))
            .await
            .unwrap();

        let check = || CheckRequest {
            identity: "chat-7".to_string(),
        };
        let first = client.should_rate_limit(check()).await.unwrap().into_inner();
        assert!(first.allowed);

        let denied = client.should_rate_limit(check()).await.unwrap_err();
        assert_eq!(denied.code(), tonic::Code::ResourceExhausted);
        assert!(denied.metadata().get("retry-after").is_some());

        let info = client
            .get_user_info(UserRequest {
                identity: "chat-7".to_string(),
            })
            .await
            .unwrap()
            .into_inner();
        assert!(info.rate_limited);

        let stats = client
            .get_global_stats(GlobalStatsRequest {})
            .await
            .unwrap()
            .into_inner();
        assert_eq!(stats.blocked_users, Some(1));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
