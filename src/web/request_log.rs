use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Logs `status | method | path | elapsed` for every request.
pub async fn request_log_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    tracing::info!(
        "{} | {} | {} | {:?}",
        response.status().as_u16(),
        method,
        path,
        started.elapsed()
    );
    response
}
