use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use pretty_assertions::assert_eq;
use sage_cli::commands::{App, Command, SpaceCommand, SummarizeArgs};
use sage_cli::config::Config;
use sage_cli::error::CliError;
use sage_core::domain::{AuthSession, SessionUser};
use sage_core::ports::{AuthClient, CompletionService, PortError, PortResult};
use sage_core::store::{MemoryStore, NamespacedStore};
use sage_core::workspace::Workspace;
use serde_json::json;

fn token_for(email: &str) -> String {
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "1", "email": email }).to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", payload)
}

struct FakeAuth;

#[async_trait]
impl AuthClient for FakeAuth {
    async fn signup(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        if email == "taken@example.com" {
            return Err(PortError::Conflict("Email already registered.".to_string()));
        }
        self.signin(email, password).await
    }

    async fn signin(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        if password != "secret" {
            return Err(PortError::Unauthorized);
        }
        Ok(AuthSession {
            token: token_for(email),
            user: SessionUser {
                email: email.to_string(),
            },
        })
    }

    async fn google(&self, _credential: &str) -> PortResult<AuthSession> {
        Err(PortError::Upstream("connection refused".to_string()))
    }

    async fn fetch_url(&self, url: &str) -> PortResult<String> {
        Ok(format!("Fetched from {}", url))
    }
}

/// Replies with queued responses, in order.
struct QueuedModel(Mutex<VecDeque<String>>);

impl QueuedModel {
    fn new(replies: &[&str]) -> Self {
        Self(Mutex::new(replies.iter().map(|r| r.to_string()).collect()))
    }
}

#[async_trait]
impl CompletionService for QueuedModel {
    async fn complete(&self, _system: &str, _prompt: &str) -> PortResult<String> {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PortError::Upstream("no reply queued".to_string()))
    }
}

fn config(with_key: bool) -> Config {
    Config::from_lookup(|key| match key {
        "GEMINI_API_KEY" if with_key => Some("key".to_string()),
        "SAGE_STATE_PATH" => Some("unused.json".to_string()),
        _ => None,
    })
    .unwrap()
}

fn app(replies: &[&str]) -> App {
    let workspace = Workspace::new(
        NamespacedStore::new(Arc::new(MemoryStore::new())),
        Arc::new(QueuedModel::new(replies)),
    );
    App::new(workspace, Arc::new(FakeAuth), config(true))
}

fn summarize(text: &str) -> Command {
    Command::Summarize(SummarizeArgs {
        text: Some(text.to_string()),
        ..Default::default()
    })
}

const SUMMARY_REPLY: &str = r#"```json
{"overview":"Cells turn food into energy.","takeaways":["Mitochondria make ATP"],"keywords":["cell","ATP","cell"]}
```"#;

#[tokio::test]
async fn sign_in_scopes_the_workspace() {
    let app = app(&[SUMMARY_REPLY]);
    assert_eq!(app.run(Command::Whoami).await.unwrap(), "Guest (not signed in)");

    app.run(summarize("Notes taken as a guest")).await.unwrap();

    let out = app
        .run(Command::Signin {
            email: "ada@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(out, "Signed in as ada@example.com");
    assert_eq!(app.run(Command::List).await.unwrap(), "No summaries yet.");

    app.run(Command::Signout).await.unwrap();
    assert_eq!(app.workspace().summaries().unwrap().len(), 1);
}

#[tokio::test]
async fn auth_failures_show_user_messages() {
    let app = app(&[]);
    let bad_password = app
        .run(Command::Signin {
            email: "ada@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(bad_password.to_string(), "Invalid credentials.");

    let taken = app
        .run(Command::Signup {
            email: "taken@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(taken.to_string(), "Email already registered.");

    let offline = app
        .run(Command::Google {
            credential: "cred".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(
        offline.to_string(),
        "Could not reach the Sage service. Please try again."
    );
    assert_eq!(app.run(Command::Whoami).await.unwrap(), "Guest (not signed in)");
}

#[tokio::test]
async fn summarize_then_show() {
    let app = app(&[SUMMARY_REPLY]);
    let out = app.run(summarize("Mitochondria are the powerhouse of the cell.")).await.unwrap();
    assert!(out.contains("Cells turn food into energy."));
    assert!(out.ends_with("Keywords: cell, ATP"));

    let id = app.workspace().summaries().unwrap()[0].id;
    assert_eq!(app.run(Command::Show { id }).await.unwrap(), out);
}

#[tokio::test]
async fn summarize_reads_files_and_urls() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, "Notes from a file").unwrap();

    let app = app(&["From file.", "From url."]);
    app.run(Command::Summarize(SummarizeArgs {
        file: Some(file),
        ..Default::default()
    }))
    .await
    .unwrap();
    app.run(Command::Summarize(SummarizeArgs {
        url: Some("https://example.com/a".to_string()),
        ..Default::default()
    }))
    .await
    .unwrap();

    let summaries = app.workspace().summaries().unwrap();
    assert_eq!(summaries[0].original_text, "Fetched from https://example.com/a");
    assert_eq!(summaries[0].overview, "From url.");
    assert_eq!(summaries[1].original_text, "Notes from a file");

    let missing = app
        .run(Command::Summarize(SummarizeArgs {
            file: Some(PathBuf::from("/definitely/not/here.txt")),
            ..Default::default()
        }))
        .await
        .unwrap_err();
    assert!(matches!(missing, CliError::Input { .. }));
}

#[tokio::test]
async fn model_commands_need_an_api_key() {
    let workspace = Workspace::new(
        NamespacedStore::new(Arc::new(MemoryStore::new())),
        Arc::new(QueuedModel::new(&[])),
    );
    let app = App::new(workspace, Arc::new(FakeAuth), config(false));

    let err = app.run(summarize("text")).await.unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
    assert_eq!(app.run(Command::List).await.unwrap(), "No summaries yet.");
}

#[tokio::test]
async fn spaces_collect_new_summaries() {
    let app = app(&["First.", "Second."]);
    app.run(Command::Space(SpaceCommand::Create {
        name: "Biology".to_string(),
    }))
    .await
    .unwrap();
    let space = app.workspace().spaces().unwrap().remove(0);

    app.run(Command::Space(SpaceCommand::Use {
        id: Some(space.id),
        none: false,
    }))
    .await
    .unwrap();
    app.run(summarize("first notes")).await.unwrap();
    app.run(Command::Space(SpaceCommand::Use { id: None, none: true }))
        .await
        .unwrap();
    app.run(summarize("second notes")).await.unwrap();

    let listing = app.run(Command::Space(SpaceCommand::List)).await.unwrap();
    assert_eq!(listing, format!("  {}  Biology  (1 summary)", space.id));

    app.run(Command::Space(SpaceCommand::Delete { id: space.id }))
        .await
        .unwrap();
    assert_eq!(
        app.run(Command::Space(SpaceCommand::List)).await.unwrap(),
        "No spaces yet."
    );
}

#[tokio::test]
async fn chat_flashcards_and_notes() {
    let app = app(&[
        SUMMARY_REPLY,
        "ATP is the cell's energy currency.",
        r#"[{"question":"What makes ATP?","answer":"Mitochondria"}]"#,
    ]);
    app.run(summarize("Mitochondria make ATP for the cell.")).await.unwrap();
    let id = app.workspace().summaries().unwrap()[0].id;

    let reply = app
        .run(Command::Chat {
            id,
            question: "What is ATP?".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(reply, "ATP is the cell's energy currency.");
    assert_eq!(
        app.run(Command::History { id }).await.unwrap(),
        "You: What is ATP?\n\nSage: ATP is the cell's energy currency."
    );

    let cards = app
        .run(Command::Flashcards { id, regenerate: false })
        .await
        .unwrap();
    assert_eq!(cards, "1. Q: What makes ATP?\n   A: Mitochondria");
    // Stored cards are shown without another model call.
    assert_eq!(
        app.run(Command::Flashcards { id, regenerate: false }).await.unwrap(),
        cards
    );

    let notes = app
        .run(Command::Notes {
            id,
            set: None,
            title: None,
        })
        .await
        .unwrap();
    assert_eq!(
        notes,
        "Mitochondria make ATP for the cell.\n\nMitochondria make ATP for the cell."
    );
    let edited = app
        .run(Command::Notes {
            id,
            set: Some("My notes".to_string()),
            title: Some("Energy".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(edited, "Energy\n\nMy notes");
}

#[tokio::test]
async fn unknown_summary_is_reported() {
    let app = app(&[]);
    let err = app.run(Command::Show { id: 7 }).await.unwrap_err();
    assert_eq!(err.to_string(), "Summary 7 not found");
}
