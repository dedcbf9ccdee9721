//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use sage_core::ports::{IdentityVerifier, UserRepository};

use crate::config::Config;
use crate::token::TokenIssuer;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    /// `None` when no Google client id is configured.
    pub google: Option<Arc<dyn IdentityVerifier>>,
    pub tokens: TokenIssuer,
    /// Client for server-side URL fetches.
    pub http: reqwest::Client,
    pub config: Arc<Config>,
}
