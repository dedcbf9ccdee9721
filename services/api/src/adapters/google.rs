//! services/api/src/adapters/google.rs
//!
//! Verifies Google ID-token credentials against Google's tokeninfo endpoint.
//! It implements the `IdentityVerifier` port from the `core` crate.

use async_trait::async_trait;
use reqwest::StatusCode;
use sage_core::domain::VerifiedIdentity;
use sage_core::ports::{IdentityVerifier, PortError, PortResult};
use serde::Deserialize;
use tracing::warn;

/// The subset of tokeninfo fields we rely on.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    /// Google returns this as the string "true"/"false".
    #[serde(default)]
    email_verified: Option<serde_json::Value>,
    name: Option<String>,
    given_name: Option<String>,
}

impl TokenInfo {
    fn email_is_verified(&self) -> bool {
        match &self.email_verified {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct GoogleIdentityVerifier {
    http: reqwest::Client,
    tokeninfo_url: String,
    client_id: String,
}

impl GoogleIdentityVerifier {
    pub fn new(http: reqwest::Client, tokeninfo_url: String, client_id: String) -> Self {
        Self {
            http,
            tokeninfo_url,
            client_id,
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, credential: &str) -> PortResult<VerifiedIdentity> {
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|e| PortError::Upstream(format!("tokeninfo request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                warn!("Google rejected the credential");
                return Err(PortError::Unauthorized);
            }
            status => {
                return Err(PortError::Upstream(format!("tokeninfo returned {status}")));
            }
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            warn!("Unreadable tokeninfo response: {}", e);
            PortError::Unauthorized
        })?;

        if info.aud != self.client_id {
            warn!("Credential was issued for a different client");
            return Err(PortError::Unauthorized);
        }
        if !info.email_is_verified() {
            warn!("Credential has no verified email");
            return Err(PortError::Unauthorized);
        }
        let email = info.email.clone().ok_or(PortError::Unauthorized)?;

        Ok(VerifiedIdentity {
            subject: info.sub,
            email,
            name: info.name,
            given_name: info.given_name,
        })
    }
}
