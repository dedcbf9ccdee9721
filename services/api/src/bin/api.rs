//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{GoogleIdentityVerifier, InMemoryUserRepository, PgUserRepository},
    config::Config,
    error::ApiError,
    token::TokenIssuer,
    web::{cors_layer, rest::ApiDoc, router, state::AppState},
};
use sage_core::ports::{IdentityVerifier, UserRepository};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    if config.uses_dev_jwt_secret() {
        warn!("JWT_SECRET not set, signing tokens with the development secret");
    }
    info!("Configuration loaded. Starting server...");

    // --- 2. Pick the Account Store ---
    let users: Arc<dyn UserRepository> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let repo = PgUserRepository::new(db_pool);
            info!("Running database migrations...");
            repo.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(repo)
        }
        None => {
            warn!("DATABASE_URL not set, accounts are kept in memory only");
            Arc::new(InMemoryUserRepository::new())
        }
    };

    // --- 3. Initialize Outbound Adapters ---
    let http = reqwest::Client::builder()
        .user_agent(concat!("sage-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {e}")))?;

    let google: Option<Arc<dyn IdentityVerifier>> = match &config.google_client_id {
        Some(client_id) => Some(Arc::new(GoogleIdentityVerifier::new(
            http.clone(),
            config.google_tokeninfo_url.clone(),
            client_id.clone(),
        ))),
        None => {
            warn!("GOOGLE_CLIENT_ID not set, Google sign-in is disabled");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        users,
        google,
        tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl_days),
        http,
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let app = router(app_state)
        .layer(cors_layer(&config.client_origin)?)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Auth server running on http://{}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
