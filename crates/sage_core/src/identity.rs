//! crates/sage_core/src/identity.rs
//!
//! Derives the storage namespace from a session token.
//!
//! The token payload is decoded locally and trusted as-is. The signature is
//! never checked here, so nothing derived from it may gate anything sensitive;
//! it only decides which namespace the client reads and writes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tracing::warn;

/// The namespace used when no identity can be derived.
pub const GUEST_NAMESPACE: &str = "anon";

/// Claims consulted for the namespace key, in priority order.
const IDENTITY_CLAIMS: [&str; 3] = ["email", "name", "given_name"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(String),
    Guest,
}

impl Identity {
    /// The key that partitions persisted collections.
    pub fn namespace(&self) -> &str {
        match self {
            Identity::User(key) => key,
            Identity::Guest => GUEST_NAMESPACE,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Identity::User(key) => key,
            Identity::Guest => "Guest",
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }
}

/// Maps a session token (or its absence) to an identity. Never fails.
pub fn derive_identity(token: Option<&str>) -> Identity {
    let Some(token) = token else {
        return Identity::Guest;
    };

    match decode_token_payload(token) {
        Some(payload) => IDENTITY_CLAIMS
            .iter()
            .filter_map(|claim| payload.get(*claim).and_then(Value::as_str))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(|value| Identity::User(value.to_string()))
            .unwrap_or(Identity::Guest),
        None => {
            warn!("Failed to parse auth token, falling back to guest");
            Identity::Guest
        }
    }
}

/// Decodes the payload segment of a three-part token into a JSON object.
pub fn decode_token_payload(token: &str) -> Option<serde_json::Map<String, Value>> {
    let segment = token.split('.').nth(1)?;
    let bytes = STANDARD.decode(base64url_to_base64(segment)).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Rewrites the url-safe alphabet to the standard one and pads to a multiple of 4.
fn base64url_to_base64(input: &str) -> String {
    let mut output: String = input
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while output.len() % 4 != 0 {
        output.push('=');
    }
    output
}
