//! services/api/src/web/rest.rs
//!
//! The health endpoint and the master definition for the OpenAPI specification.

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::web::auth::{AuthResponse, CredentialsRequest, GoogleRequest, UserResponse};
use crate::web::fetch::{FetchUrlRequest, FetchUrlResponse};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        crate::web::auth::signup_handler,
        crate::web::auth::signin_handler,
        crate::web::auth::google_handler,
        crate::web::fetch::fetch_url_handler,
    ),
    components(
        schemas(
            HealthResponse,
            CredentialsRequest,
            GoogleRequest,
            AuthResponse,
            UserResponse,
            FetchUrlRequest,
            FetchUrlResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Sage API", description = "Authentication and URL fetching for the Sage note summarizer.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
}

/// The body of every 4xx/5xx response.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/health - Liveness probe
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}
