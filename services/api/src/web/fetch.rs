//! services/api/src/web/fetch.rs
//!
//! Fetches remote text on behalf of the browser client, which cannot read
//! most pages directly because of cross-origin restrictions.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header::CONTENT_TYPE,
    Json,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::HttpError;
use crate::web::auth::json_body;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct FetchUrlRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct FetchUrlResponse {
    pub content: String,
}

/// POST /api/fetch-url - Fetch a remote text resource
#[utoipa::path(
    post,
    path = "/api/fetch-url",
    request_body = FetchUrlRequest,
    responses(
        (status = 200, description = "Text content, truncated to the configured maximum", body = FetchUrlResponse),
        (status = 400, description = "Missing, malformed or non-http(s) URL"),
        (status = 415, description = "Resource is not text"),
        (status = 502, description = "Fetching the resource failed")
    )
)]
pub async fn fetch_url_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FetchUrlRequest>, JsonRejection>,
) -> Result<Json<FetchUrlResponse>, HttpError> {
    let req = json_body(payload)?;
    let url = parse_http_url(&req.url)?;

    let mut response = state
        .http
        .get(url.clone())
        .timeout(Duration::from_secs(state.config.fetch_timeout_secs))
        .send()
        .await
        .map_err(|e| {
            error!("Failed to fetch {}: {}", url, e);
            HttpError::BadGateway("Failed to fetch URL.".to_string())
        })?;

    if !response.status().is_success() {
        error!("Fetching {} returned {}", url, response.status());
        return Err(HttpError::BadGateway(format!(
            "Failed to fetch URL (status {}).",
            response.status().as_u16()
        )));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !is_text(content_type) {
        return Err(HttpError::UnsupportedMediaType(
            "Only text content is supported.".to_string(),
        ));
    }

    let content = read_text_prefix(&mut response, state.config.fetch_max_chars)
        .await
        .map_err(|e| {
            error!("Failed to read body of {}: {}", url, e);
            HttpError::BadGateway("Failed to fetch URL.".to_string())
        })?;
    info!("Fetched {} characters from {}", content.chars().count(), url);

    Ok(Json(FetchUrlResponse { content }))
}

fn parse_http_url(raw: &str) -> Result<Url, HttpError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(HttpError::BadRequest("URL is required.".to_string()));
    }
    let url = Url::parse(raw).map_err(|_| HttpError::BadRequest("Invalid URL.".to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(HttpError::BadRequest(
            "Only http and https URLs are supported.".to_string(),
        )),
    }
}

fn is_text(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("text/")
}

/// Reads the body until `max` characters are collected. The rest of the body
/// is never requested, so an oversized or endless resource costs at most `max`.
async fn read_text_prefix(
    response: &mut reqwest::Response,
    max: usize,
) -> reqwest::Result<String> {
    let mut text = TextPrefix::new(max);
    while !text.is_full() {
        match response.chunk().await? {
            Some(chunk) => text.push(&chunk),
            None => break,
        }
    }
    Ok(text.finish())
}

/// Incremental UTF-8 decoding capped at a character (not byte) count.
/// A sequence split across chunks is held back until its next byte arrives.
struct TextPrefix {
    text: String,
    chars: usize,
    max: usize,
    pending: Vec<u8>,
}

impl TextPrefix {
    fn new(max: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            max,
            pending: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.chars >= self.max
    }

    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        let buf = std::mem::take(&mut self.pending);
        let mut rest = buf.as_slice();
        while !rest.is_empty() && !self.is_full() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.append(valid);
                    rest = &[];
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.append(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            self.append("\u{FFFD}");
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            rest = &[];
                        }
                    }
                }
            }
        }
    }

    fn append(&mut self, s: &str) {
        for c in s.chars() {
            if self.is_full() {
                return;
            }
            self.text.push(c);
            self.chars += 1;
        }
    }

    fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            self.append("\u{FFFD}");
        }
        self.text
    }
}
