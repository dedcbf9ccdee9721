use pretty_assertions::assert_eq;
use sage_cli::adapters::{HttpAuthClient, OpenAiCompletionAdapter};
use sage_core::ports::{AuthClient, CompletionService, PortError};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth_client(server: &MockServer) -> HttpAuthClient {
    HttpAuthClient::new(reqwest::Client::new(), server.uri())
}

#[tokio::test]
async fn signin_returns_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .and(body_json(json!({ "email": "ada@example.com", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "a.b.c",
            "user": { "email": "ada@example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = auth_client(&server).signin("ada@example.com", "pw").await.unwrap();
    assert_eq!(session.token, "a.b.c");
    assert_eq!(session.user.email, "ada@example.com");
}

#[tokio::test]
async fn error_statuses_map_to_port_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid credentials." })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signup"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "error": "Email already registered." })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/google"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "error": "Google sign-in is not configured." })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/fetch-url"))
        .respond_with(ResponseTemplate::new(415).set_body_json(json!({ "error": "URL did not return text content." })))
        .mount(&server)
        .await;

    let client = auth_client(&server);
    assert!(matches!(client.signin("a@b.c", "x").await, Err(PortError::Unauthorized)));
    match client.signup("a@b.c", "x").await {
        Err(PortError::Conflict(message)) => assert_eq!(message, "Email already registered."),
        other => panic!("expected conflict, got {:?}", other),
    }
    assert!(matches!(client.google("cred").await, Err(PortError::Upstream(_))));
    match client.fetch_url("https://example.com/file.pdf").await {
        Err(PortError::Invalid(message)) => assert_eq!(message, "URL did not return text content."),
        other => panic!("expected invalid, got {:?}", other),
    }
}

#[tokio::test]
async fn fetch_url_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/fetch-url"))
        .and(body_json(json!({ "url": "https://example.com/notes" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": "Lecture notes" })))
        .mount(&server)
        .await;

    let content = auth_client(&server)
        .fetch_url("https://example.com/notes")
        .await
        .unwrap();
    assert_eq!(content, "Lecture notes");
}

#[tokio::test]
async fn unreachable_service_is_upstream() {
    let client = HttpAuthClient::new(reqwest::Client::new(), "http://127.0.0.1:1");
    assert!(matches!(client.signin("a@b.c", "x").await, Err(PortError::Upstream(_))));
}

#[tokio::test]
async fn completion_sends_system_and_user_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gemini-2.5-flash",
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "Summarize this." }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1735689600,
            "model": "gemini-2.5-flash",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "{\"overview\":\"Short.\"}" },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter =
        OpenAiCompletionAdapter::from_parts(&server.uri(), "test-key", "gemini-2.5-flash".to_string());
    let reply = adapter.complete("Be brief.", "Summarize this.").await.unwrap();
    assert_eq!(reply, "{\"overview\":\"Short.\"}");
}

#[tokio::test]
async fn completion_rejection_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "API key not valid.",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        })))
        .mount(&server)
        .await;

    let adapter = OpenAiCompletionAdapter::from_parts(&server.uri(), "bad", "gemini-2.5-flash".to_string());
    assert!(matches!(
        adapter.complete("s", "p").await,
        Err(PortError::Upstream(_))
    ));
}
