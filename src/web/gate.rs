//! Access gate for protected routes.
//!
//! Extracts the presented token, validates it and either rejects the request
//! or forwards it with an [`AuthenticatedUser`] extension attached. Every
//! validation failure yields the same opaque 401 so callers cannot probe
//! which users exist.

use crate::web::api::{AppState, json_error};
use crate::web::models::TokenRequest;
use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};

/// Upper bound on a body read while looking for a `token` field.
const MAX_TOKEN_BODY: usize = 16 * 1024;

/// Username of a request that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

pub async fn access_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();

    let (token, body) = match bearer_token(&parts.headers) {
        Some(token) => (Some(token), body),
        None => {
            let Ok(bytes) = to_bytes(body, MAX_TOKEN_BODY).await else {
                return json_error("Request body too large", StatusCode::BAD_REQUEST);
            };
            let token = serde_json::from_slice::<TokenRequest>(&bytes)
                .ok()
                .map(|r| r.token);
            (token, Body::from(bytes))
        }
    };

    let Some(token) = token else {
        return json_error("A token is required", StatusCode::BAD_REQUEST);
    };

    match state.validator.validate(&token) {
        Ok(username) => {
            let mut req = Request::from_parts(parts, body);
            req.extensions_mut().insert(AuthenticatedUser(username));
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(reason = %e, "Rejected token");
            json_error("Invalid token", StatusCode::UNAUTHORIZED)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}
