//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use std::sync::Arc;

use api_lib::{
    adapters::{GoogleIdentityVerifier, InMemoryUserRepository},
    config::Config,
    token::TokenIssuer,
    web::{router, state::AppState},
};
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";
pub const GOOGLE_CLIENT_ID: &str = "sage-test.apps.googleusercontent.com";

pub fn test_config(google_tokeninfo_url: Option<String>) -> Config {
    Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        "GOOGLE_CLIENT_ID" => google_tokeninfo_url.as_ref().map(|_| GOOGLE_CLIENT_ID.to_string()),
        "GOOGLE_TOKENINFO_URL" => google_tokeninfo_url.clone(),
        _ => None,
    })
    .expect("test config is valid")
}

/// A router over an empty in-memory account store.
pub fn app(google_tokeninfo_url: Option<String>) -> Router {
    app_with_config(test_config(google_tokeninfo_url))
}

pub fn app_with_config(config: Config) -> Router {
    let config = Arc::new(config);
    let http = reqwest::Client::new();
    let google = config.google_client_id.clone().map(|client_id| {
        Arc::new(GoogleIdentityVerifier::new(
            http.clone(),
            config.google_tokeninfo_url.clone(),
            client_id,
        )) as Arc<dyn sage_core::ports::IdentityVerifier>
    });

    router(Arc::new(AppState {
        users: Arc::new(InMemoryUserRepository::new()),
        google,
        tokens: TokenIssuer::new(TEST_SECRET, config.token_ttl_days),
        http,
        config,
    }))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request builds");

    let response = app.clone().oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, json)
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}
