//! services/cli/src/config.rs
//!
//! Client configuration, loaded from environment variables (and `.env` outside tests).

use std::path::PathBuf;
use tracing::Level;

const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the auth service.
    pub api_url: String,
    /// Key for the hosted model; only commands that call the model need it.
    pub ai_api_key: Option<String>,
    pub ai_base_url: String,
    pub model: String,
    /// File holding the client's key-value state.
    pub state_path: PathBuf,
    pub log_level: Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = var("SAGE_API_URL")
            .unwrap_or_else(|| "http://localhost:5175".to_string())
            .trim_end_matches('/')
            .to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "SAGE_API_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_url),
            ));
        }

        let ai_api_key = var("GEMINI_API_KEY").filter(|k| !k.trim().is_empty());
        let ai_base_url = var("SAGE_AI_BASE_URL")
            .unwrap_or_else(|| GEMINI_OPENAI_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let model = var("SAGE_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string());

        let state_path = var("SAGE_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./sage-state.json"));

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "WARN".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_url,
            ai_api_key,
            ai_base_url,
            model,
            state_path,
            log_level,
        })
    }

    pub fn require_ai_api_key(&self) -> Result<&str, ConfigError> {
        self.ai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))
    }
}
