//! crates/sage_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, so the core
//! stays independent of the concrete database, model provider and HTTP stack.

use async_trait::async_trait;

use crate::domain::{Account, AuthSession, VerifiedIdentity};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Upstream service failed: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A single mutation applied by `KeyValueStore::apply_batch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Set { key: String, value: String },
    Remove { key: String },
}

/// The client-side key-value substrate. Plain synchronous read/modify/write,
/// last writer wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove(&self, key: &str) -> PortResult<()>;

    /// Applies every operation or none of them.
    fn apply_batch(&self, ops: Vec<WriteOp>) -> PortResult<()>;
}

/// Account storage used by the auth service.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> PortResult<Option<Account>>;

    /// Stores a new account. Fails with `PortError::Conflict` if the email is taken.
    async fn insert(&self, account: Account) -> PortResult<Account>;
}

/// Verifies a credential issued by a third-party identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> PortResult<VerifiedIdentity>;
}

/// A single-shot text generation call against a hosted language model.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> PortResult<String>;
}

/// The client's view of the auth service.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn signup(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    async fn signin(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    async fn google(&self, credential: &str) -> PortResult<AuthSession>;

    /// Fetches a remote text resource through the service.
    async fn fetch_url(&self, url: &str) -> PortResult<String>;
}
