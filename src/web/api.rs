//! Defines the Axum API routes and handlers.

use crate::auth::{AuthBackend, AuthError, CredentialRegistry, TokenService, TokenValidator};
use crate::config::Config;
use crate::web::gate::{AuthenticatedUser, access_gate};
use crate::web::models::{AuthResponse, CredentialsRequest, MessageResponse, TokenCheckResponse};
use crate::web::protected::ProtectedResource;
use crate::web::rate_limit::rate_limit_middleware;
use crate::web::rate_limiter::RateLimiter;
use crate::web::request_log::request_log_middleware;
use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokengate_shared::ConcurrentStore;

/// Helper to create a JSON failure response with a message and status code
pub fn json_error(message: &str, status: StatusCode) -> Response {
    let body = MessageResponse {
        success: false,
        message: message.to_string(),
    };
    (status, Json(body)).into_response()
}

fn auth_error_response(err: &AuthError) -> Response {
    match err {
        AuthError::BadRequest(reason) => json_error(reason, StatusCode::BAD_REQUEST),
        AuthError::AlreadyExists => json_error("This user already exists", StatusCode::FORBIDDEN),
        AuthError::InvalidCredentials => json_error("Invalid credentials", StatusCode::UNAUTHORIZED),
    }
}

pub struct AppStateInner {
    pub auth_backend: Box<dyn AuthBackend>,
    pub tokens: TokenService,
    pub validator: TokenValidator,
    pub protected: ProtectedResource,
    pub rate_limiter: Option<RateLimiter>,
}
pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(
        auth_backend: Box<dyn AuthBackend>,
        tokens: TokenService,
        protected: ProtectedResource,
        rate_limiter: Option<RateLimiter>,
    ) -> Self {
        let validator = tokens.validator();
        Self {
            auth_backend,
            tokens,
            validator,
            protected,
            rate_limiter,
        }
    }

    /// Wire the services to the two stores using the given config.
    pub fn from_config(
        config: &Config,
        users: Arc<ConcurrentStore>,
        secrets: Arc<ConcurrentStore>,
    ) -> Self {
        let auth_backend = Box::new(CredentialRegistry::new(users));
        let tokens = TokenService::new(secrets, config.token.ttl(), config.token.secret_length);
        let protected = ProtectedResource::new(config.protected.delay(), config.protected.cache_ttl());
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window()));
        Self::new(auth_backend, tokens, protected, rate_limiter)
    }
}

/// Creates the Axum router with all the API endpoints.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/time", post(time_handler))
        .route("/api/v1/auth/check", get(auth_check))
        .route_layer(from_fn_with_state(state.clone(), access_gate));

    let mut router = Router::new()
        .route("/api/v1/createuser", post(create_user))
        .route("/api/v1/generatetoken", post(generate_token))
        .merge(protected)
        .with_state(state.clone());

    if let Some(limiter) = state.rate_limiter.clone() {
        router = router.layer(from_fn_with_state(limiter, rate_limit_middleware));
    }
    router.layer(from_fn(request_log_middleware))
}

fn parse_credentials(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest, Response> {
    let missing = || json_error("A username and password are required", StatusCode::BAD_REQUEST);
    match payload {
        Ok(Json(req)) if !req.username.is_empty() && !req.password.is_empty() => Ok(req),
        Ok(_) => Err(missing()),
        Err(e) => {
            tracing::debug!("Rejected credentials body: {}", e);
            Err(missing())
        }
    }
}

/// POST /api/v1/createuser
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let req = match parse_credentials(payload) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    match state.auth_backend.register(&req.username, &req.password).await {
        Ok(()) => {
            let body = MessageResponse {
                success: true,
                message: "User created".to_string(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => auth_error_response(&e),
    }
}

/// POST /api/v1/generatetoken
async fn generate_token(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let req = match parse_credentials(payload) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    if let Err(e) = state.auth_backend.authenticate(&req.username, &req.password).await {
        return auth_error_response(&e);
    }
    match state.tokens.issue(&req.username) {
        Ok(token) => (StatusCode::OK, Json(AuthResponse { success: true, token })).into_response(),
        Err(e) => {
            tracing::error!("Issuing token failed: {}", e);
            json_error("An error occurred", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /api/v1/time -- the slow protected resource
async fn time_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(username)): Extension<AuthenticatedUser>,
) -> Response {
    let now = state.protected.current_time(&username).await;
    (StatusCode::OK, now).into_response()
}

/// GET /api/v1/auth/check
async fn auth_check(Extension(AuthenticatedUser(username)): Extension<AuthenticatedUser>) -> Response {
    (StatusCode::OK, Json(TokenCheckResponse { valid: true, username })).into_response()
}
