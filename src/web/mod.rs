//! The web module for handling the Axum API.
//! This file declares the other files in this directory as sub-modules.

pub mod api;
pub mod gate;
pub mod models;
pub mod protected;
pub mod rate_limit;
pub mod rate_limiter;
pub mod request_log;

pub use api::{AppState, AppStateInner, create_router};
pub use gate::AuthenticatedUser;
