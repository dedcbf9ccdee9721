pub mod auth;
pub mod fetch;
pub mod rest;
pub mod state;

use std::sync::Arc;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use state::AppState;

pub use auth::{google_handler, signin_handler, signup_handler};
pub use fetch::fetch_url_handler;
pub use rest::health_handler;

/// Builds the API routes over the shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/auth/signup", post(signup_handler))
        .route("/api/auth/signin", post(signin_handler))
        .route("/api/auth/google", post(google_handler))
        .route("/api/fetch-url", post(fetch_url_handler))
        .with_state(state)
}

/// Allows the browser client's origin, with credentials.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ApiError> {
    let origin = origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CLIENT_ORIGIN '{}': {}", origin, e)))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]))
}
