use tonic_build::manual::{Builder, Method, Service};

const MESSAGES: &str = "crate::grpc::messages";

fn method(name: &str, route_name: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route_name)
        .input_type(format!("{}::{}", MESSAGES, input))
        .output_type(format!("{}::{}", MESSAGES, output))
        .codec_path("tonic::codec::ProstCodec")
        .build()
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Messages are prost structs in src/grpc/messages.rs, so only the
    // service glue is generated here and no protoc is required.
    let service = Service::builder()
        .name("RateLimitService")
        .package("ttskit.ratelimit.v1")
        .method(method(
            "should_rate_limit",
            "ShouldRateLimit",
            "CheckRequest",
            "CheckResponse",
        ))
        .method(method(
            "get_user_stats",
            "GetUserStats",
            "UserRequest",
            "UserStatsResponse",
        ))
        .method(method(
            "reset_user",
            "ResetUser",
            "UserRequest",
            "ResetUserResponse",
        ))
        .method(method(
            "get_global_stats",
            "GetGlobalStats",
            "GlobalStatsRequest",
            "GlobalStatsResponse",
        ))
        .method(method(
            "get_user_info",
            "GetUserInfo",
            "UserRequest",
            "UserInfoResponse",
        ))
        .build();

    Builder::new().compile(&[service]);
}
