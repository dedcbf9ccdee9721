//! services/cli/src/adapters/auth_http.rs
//!
//! The `AuthClient` port over the auth service's HTTP API.

use async_trait::async_trait;
use reqwest::StatusCode;
use sage_core::domain::AuthSession;
use sage_core::ports::{AuthClient, PortError, PortResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct FetchUrlBody {
    content: String,
}

#[derive(Clone)]
pub struct HttpAuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> PortResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Upstream(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| PortError::Upstream(format!("unreadable response: {e}")));
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("request failed with status {}", status.as_u16()));
        Err(match status {
            StatusCode::UNAUTHORIZED => PortError::Unauthorized,
            StatusCode::CONFLICT => PortError::Conflict(message),
            StatusCode::BAD_REQUEST | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                PortError::Invalid(message)
            }
            _ => PortError::Upstream(message),
        })
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn signup(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        self.post("/api/auth/signup", &json!({ "email": email, "password": password }))
            .await
    }

    async fn signin(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        self.post("/api/auth/signin", &json!({ "email": email, "password": password }))
            .await
    }

    async fn google(&self, credential: &str) -> PortResult<AuthSession> {
        self.post("/api/auth/google", &json!({ "credential": credential }))
            .await
    }

    async fn fetch_url(&self, url: &str) -> PortResult<String> {
        let body: FetchUrlBody = self.post("/api/fetch-url", &json!({ "url": url })).await?;
        Ok(body.content)
    }
}
