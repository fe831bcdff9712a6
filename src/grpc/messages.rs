//! Wire messages for `ttskit.ratelimit.v1.RateLimitService`.

use chrono::{DateTime, Utc};
use prost_types::Timestamp;

use crate::ratelimit::{Decision, GlobalStats, UserInfo, UserStats};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckRequest {
    /// User id, client IP, or any other key the limit is scoped to
    #[prost(string, tag = "1")]
    pub identity: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckResponse {
    #[prost(bool, tag = "1")]
    pub allowed: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(uint64, tag = "3")]
    pub remaining: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserRequest {
    #[prost(string, tag = "1")]
    pub identity: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserStatsResponse {
    #[prost(uint64, tag = "1")]
    pub requests: u64,
    #[prost(uint64, tag = "2")]
    pub remaining: u64,
    #[prost(message, optional, tag = "3")]
    pub window_start: Option<Timestamp>,
    #[prost(double, tag = "4")]
    pub window_remaining_seconds: f64,
    #[prost(bool, tag = "5")]
    pub blocked: bool,
    #[prost(message, optional, tag = "6")]
    pub blocked_until: Option<Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResetUserResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GlobalStatsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GlobalStatsResponse {
    #[prost(uint64, optional, tag = "1")]
    pub total_users: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub active_users: Option<u64>,
    #[prost(uint64, optional, tag = "3")]
    pub blocked_users: Option<u64>,
    #[prost(uint64, tag = "4")]
    pub max_requests_per_window: u64,
    #[prost(uint64, tag = "5")]
    pub window_seconds: u64,
    #[prost(uint64, tag = "6")]
    pub block_duration_seconds: u64,
    #[prost(string, optional, tag = "7")]
    pub error: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserInfoResponse {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(bool, tag = "2")]
    pub rate_limited: bool,
    #[prost(string, optional, tag = "3")]
    pub message: Option<String>,
    #[prost(uint64, tag = "4")]
    pub remaining_requests: u64,
    #[prost(message, optional, tag = "5")]
    pub reset_time: Option<Timestamp>,
    #[prost(string, optional, tag = "6")]
    pub error: Option<String>,
}

fn timestamp(dt: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

impl From<Decision> for CheckResponse {
    fn from(d: Decision) -> Self {
        Self {
            allowed: d.allowed,
            message: d.message,
            remaining: d.remaining,
        }
    }
}

impl From<UserStats> for UserStatsResponse {
    fn from(s: UserStats) -> Self {
        Self {
            requests: s.requests,
            remaining: s.remaining,
            window_start: s.window_start.map(timestamp),
            window_remaining_seconds: s.window_remaining.as_secs_f64(),
            blocked: s.blocked,
            blocked_until: s.blocked_until.map(timestamp),
        }
    }
}

impl From<GlobalStats> for GlobalStatsResponse {
    fn from(s: GlobalStats) -> Self {
        Self {
            total_users: s.total_users.map(|n| n as u64),
            active_users: s.active_users.map(|n| n as u64),
            blocked_users: s.blocked_users.map(|n| n as u64),
            max_requests_per_window: s.max_requests_per_window,
            window_seconds: s.window_seconds,
            block_duration_seconds: s.block_duration,
            error: s.error,
        }
    }
}

impl From<UserInfo> for UserInfoResponse {
    fn from(i: UserInfo) -> Self {
        Self {
            user_id: i.user_id,
            rate_limited: i.rate_limited,
            message: i.message,
            remaining_requests: i.remaining_requests,
            reset_time: i.reset_time.map(timestamp),
            error: i.error,
        }
    }
}
