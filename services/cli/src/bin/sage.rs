//! services/cli/src/bin/sage.rs

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use sage_cli::{
    adapters::{FileStore, HttpAuthClient, OpenAiCompletionAdapter},
    commands::{App, Cli},
    config::Config,
    error::CliError,
};
use sage_core::store::NamespacedStore;
use sage_core::workspace::Workspace;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String, CliError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- 2. Open the Local State ---
    let store = FileStore::open(&config.state_path).map_err(|e| CliError::Service(e.to_string()))?;
    let store = NamespacedStore::new(Arc::new(store));

    // --- 3. Initialize Outbound Adapters ---
    // The key is checked again by the commands that reach the model.
    let model = OpenAiCompletionAdapter::from_parts(
        &config.ai_base_url,
        config.ai_api_key.as_deref().unwrap_or_default(),
        config.model.clone(),
    );
    let http = reqwest::Client::builder()
        .user_agent(concat!("sage/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CliError::Service(format!("Failed to build HTTP client: {e}")))?;
    let auth = HttpAuthClient::new(http, config.api_url.clone());

    // --- 4. Run the Command ---
    let workspace = Workspace::new(store, Arc::new(model));
    let app = App::new(workspace, Arc::new(auth), config);
    app.run(cli.command).await
}
