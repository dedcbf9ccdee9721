//! services/api/src/token.rs
//!
//! Issues the signed session token handed to clients after sign-in.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use sage_core::domain::Account;
use sage_core::ports::{PortError, PortResult};
use serde::{Deserialize, Serialize};

/// Claims carried in the token payload. Clients read `email` (or the name
/// claims for Google accounts) to pick their storage namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    pub fn issue(
        &self,
        account: &Account,
        name: Option<String>,
        given_name: Option<String>,
    ) -> PortResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id.clone(),
            email: account.email.clone(),
            name,
            given_name,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| PortError::Unexpected(format!("failed to sign token: {e}")))
    }
}
