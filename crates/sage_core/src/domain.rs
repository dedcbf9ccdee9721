//! crates/sage_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Persisted records serialize with the field names the stored layout uses
//! (`text`, `summary`, `date`, `summaryIds`), so a record written by one
//! client build is readable by any other.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The structured result of summarizing a piece of user-submitted text.
///
/// Immutable once created; removed only by clearing the owning namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Creation time in milliseconds, unique within its namespace.
    pub id: i64,
    #[serde(rename = "text")]
    pub original_text: String,
    #[serde(rename = "summary")]
    pub overview: String,
    #[serde(default)]
    pub takeaways: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Human-readable creation time, for display only.
    #[serde(rename = "date")]
    pub created_at: String,
}

/// The three fields the model is asked to produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SummaryFields {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub takeaways: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SummaryFields {
    /// Drops blank entries, and duplicate keywords while keeping first-seen order.
    pub fn normalized(self) -> Self {
        let takeaways = self
            .takeaways
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let mut keywords: Vec<String> = Vec::with_capacity(self.keywords.len());
        for keyword in self.keywords {
            let keyword = keyword.trim().to_string();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }

        Self {
            overview: self.overview.trim().to_string(),
            takeaways,
            keywords,
        }
    }
}

/// A named grouping of summary records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub summary_ids: Vec<i64>,
}

impl Space {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            summary_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single entry in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

/// How an account proves its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
        }
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthProvider::Local),
            "google" => Ok(AuthProvider::Google),
            other => Err(format!("unknown auth provider '{other}'")),
        }
    }
}

// Only used by the auth service - contains sensitive data
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    /// Present only for `AuthProvider::Local` accounts.
    pub password_hash: Option<String>,
    pub provider: AuthProvider,
}

/// Claims returned by a third-party identity provider after verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub given_name: Option<String>,
}

/// What the auth service hands back on a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: String,
}
