//! Contains the data models for API requests and responses.

use serde::{Deserialize, Serialize};

/// Body of `/createuser` and `/generatetoken`.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Token carried in a JSON body instead of the `Authorization` header.
#[derive(Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Generic success/failure envelope.
#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Successful login.
#[derive(Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
}

/// Represents a token validation response.
#[derive(Serialize, Deserialize, Debug)]
pub struct TokenCheckResponse {
    pub valid: bool,
    pub username: String,
}
