//! services/api/src/config.rs
//!
//! Defines the auth service's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";
const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub client_origin: String,
    /// Absent selects the in-memory account store.
    pub database_url: Option<String>,
    /// Absent disables Google sign-in.
    pub google_client_id: Option<String>,
    pub google_tokeninfo_url: String,
    pub fetch_max_chars: usize,
    pub fetch_timeout_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5175".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let client_origin =
            var("CLIENT_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        // --- Token Settings ---
        let jwt_secret = var("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEV_JWT_SECRET.to_string());
        let token_ttl_days = parse_or("TOKEN_TTL_DAYS", var("TOKEN_TTL_DAYS"), 7)?;
        if token_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }

        // --- Optional Backends ---
        let database_url = var("DATABASE_URL").filter(|s| !s.is_empty());
        let google_client_id = var("GOOGLE_CLIENT_ID").filter(|s| !s.is_empty());
        let google_tokeninfo_url =
            var("GOOGLE_TOKENINFO_URL").unwrap_or_else(|| GOOGLE_TOKENINFO_URL.to_string());

        // --- URL Fetch Settings ---
        let fetch_max_chars = parse_or("FETCH_MAX_CHARS", var("FETCH_MAX_CHARS"), 50_000)?;
        let fetch_timeout_secs = parse_or("FETCH_TIMEOUT_SECS", var("FETCH_TIMEOUT_SECS"), 15)?;

        Ok(Self {
            bind_address,
            log_level,
            jwt_secret,
            token_ttl_days,
            client_origin,
            database_url,
            google_client_id,
            google_tokeninfo_url,
            fetch_max_chars,
            fetch_timeout_secs,
        })
    }

    /// True when tokens are signed with the well-known development secret.
    pub fn uses_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 5175);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert!(config.uses_dev_jwt_secret());
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.fetch_max_chars, 50_000);
        assert!(config.database_url.is_none());
        assert!(config.google_client_id.is_none());
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = config_from(&[
            ("BIND_ADDRESS", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("GOOGLE_CLIENT_ID", "client.apps.googleusercontent.com"),
            ("FETCH_MAX_CHARS", "100"),
        ])
        .unwrap();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:9000");
        assert_eq!(config.jwt_secret, "s3cret");
        assert!(!config.uses_dev_jwt_secret());
        assert_eq!(
            config.google_client_id.as_deref(),
            Some("client.apps.googleusercontent.com")
        );
        assert_eq!(config.fetch_max_chars, 100);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            config_from(&[("BIND_ADDRESS", "nowhere")]),
            Err(ConfigError::InvalidValue(key, _)) if key == "BIND_ADDRESS"
        ));
        assert!(matches!(
            config_from(&[("TOKEN_TTL_DAYS", "0")]),
            Err(ConfigError::InvalidValue(key, _)) if key == "TOKEN_TTL_DAYS"
        ));
        assert!(matches!(
            config_from(&[("RUST_LOG", "chatty")]),
            Err(ConfigError::InvalidValue(key, _)) if key == "RUST_LOG"
        ));
    }
}
