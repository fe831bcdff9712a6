//! Rate limit service implementation.

use tonic::{Request, Response, Status};
use tracing::{debug, info, instrument, warn};

use super::messages::{
    CheckRequest, CheckResponse, GlobalStatsRequest, GlobalStatsResponse, ResetUserResponse,
    UserInfoResponse, UserRequest, UserStatsResponse,
};
use super::proto::rate_limit_service_server::RateLimitService;
use crate::error::LimiterError;
use crate::ratelimit::RateLimitHandle;

/// gRPC front for the process rate limiter.
///
/// Used by the API before synthesis requests and by the bot's command
/// handlers, plus the admin reporting endpoints.
pub struct RateLimitServiceImpl {
    /// The rate limiter handle
    limiter: RateLimitHandle,
}

impl RateLimitServiceImpl {
    /// Create a new RateLimitServiceImpl with the given limiter handle.
    pub fn new(limiter: RateLimitHandle) -> Self {
        Self { limiter }
    }
}

#[tonic::async_trait]
impl RateLimitService for RateLimitServiceImpl {
    /// Admission check.
    ///
    /// A denial is returned as `RESOURCE_EXHAUSTED` with a `retry-after`
    /// metadata entry holding the seconds left on the block.
    #[instrument(skip(self, request), fields(identity = %request.get_ref().identity))]
    async fn should_rate_limit(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        let req = request.into_inner();

        match self.limiter.enforce(&req.identity).await {
            Ok(decision) => {
                debug!(remaining = decision.remaining, "Request admitted");
                Ok(Response::new(decision.into()))
            }
            Err(e @ LimiterError::RateLimited { .. }) => {
                info!(reason = %e, "Request denied");
                Err(e.into())
            }
            Err(e) => {
                warn!(error = %e, "Rate limit check failed");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, request), fields(identity = %request.get_ref().identity))]
    async fn get_user_stats(
        &self,
        request: Request<UserRequest>,
    ) -> Result<Response<UserStatsResponse>, Status> {
        let req = request.into_inner();
        let stats = self.limiter.user_stats(&req.identity).await.map_err(|e| {
            warn!(error = %e, "Failed to read user stats");
            Status::from(e)
        })?;
        Ok(Response::new(stats.into()))
    }

    #[instrument(skip(self, request), fields(identity = %request.get_ref().identity))]
    async fn reset_user(
        &self,
        request: Request<UserRequest>,
    ) -> Result<Response<ResetUserResponse>, Status> {
        let req = request.into_inner();
        self.limiter.reset(&req.identity).await.map_err(|e| {
            warn!(error = %e, "Failed to reset user");
            Status::from(e)
        })?;
        info!("Rate limit reset");
        Ok(Response::new(ResetUserResponse {}))
    }

    #[instrument(skip(self, _request))]
    async fn get_global_stats(
        &self,
        _request: Request<GlobalStatsRequest>,
    ) -> Result<Response<GlobalStatsResponse>, Status> {
        Ok(Response::new(self.limiter.global_stats().await.into()))
    }

    #[instrument(skip(self, request), fields(identity = %request.get_ref().identity))]
    async fn get_user_info(
        &self,
        request: Request<UserRequest>,
    ) -> Result<Response<UserInfoResponse>, Status> {
        let req = request.into_inner();
        Ok(Response::new(self.limiter.user_info(&req.identity).await.into()))
    }
}
