//! services/cli/src/error.rs

use sage_core::ports::PortError;
use sage_core::workspace::WorkspaceError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Workspace(#[from] WorkspaceError),

    #[error("{0}")]
    Service(String),

    #[error("Could not read {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),
}

impl From<PortError> for CliError {
    /// Maps service failures to the messages a user should see.
    fn from(err: PortError) -> Self {
        match err {
            PortError::Unauthorized => CliError::Service("Invalid credentials.".to_string()),
            PortError::Conflict(message) | PortError::Invalid(message) => {
                CliError::Service(message)
            }
            other => {
                tracing::error!("Service call failed: {:?}", other);
                CliError::Service("Could not reach the Sage service. Please try again.".to_string())
            }
        }
    }
}
