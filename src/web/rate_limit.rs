use crate::web::api::json_error;
use crate::web::rate_limiter::RateLimiter;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};

/// Middleware rejecting clients that exceed the configured request rate.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&req);
    if !limiter.check_and_increment(ip).await {
        tracing::warn!(%ip, "Rate limit exceeded");
        return json_error("Too many requests", StatusCode::TOO_MANY_REQUESTS);
    }
    next.run(req).await
}

/// Peer address if the server was started with connect info, else the first
/// `x-forwarded-for` entry, else loopback.
fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse().ok())
        })
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}
