//! crates/sage_core/src/workspace.rs
//!
//! The client-side application logic: everything a signed-in (or guest) user
//! does with their summaries, spaces, conversations, flashcards and notes.
//!
//! All state lives in the key-value substrate behind `NamespacedStore`. The
//! namespace is re-derived from the stored session token on every call, so a
//! sign-in or sign-out takes effect immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{AuthSession, ChatMessage, ChatRole, Flashcard, Space, SummaryRecord};
use crate::identity::{derive_identity, Identity};
use crate::ports::{CompletionService, PortError};
use crate::store::{Collection, NamespacedStore, AUTH_TOKEN_KEY};
use crate::summarize::{
    chat_prompt, flashcard_prompt, parse_flashcards, parse_summary_response, summary_prompt,
    CHAT_SYSTEM, FLASHCARD_SYSTEM, SUMMARY_SYSTEM,
};

const DEFAULT_NOTES_TITLE: &str = "Untitled Document";
const NOTES_TITLE_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Please enter some notes to summarize")]
    EmptyInput,
    #[error("Please enter a question")]
    EmptyQuestion,
    #[error("Space name cannot be empty")]
    EmptySpaceName,
    #[error("A summary is already being generated")]
    Busy,
    #[error("Summary {0} not found")]
    SummaryNotFound(i64),
    #[error("Space {0} not found")]
    SpaceNotFound(Uuid),
    #[error("Failed to generate summary. Please try again.")]
    Summarize,
    #[error("Failed to generate flashcards. Please try again.")]
    Flashcards,
    #[error("Failed to get a reply. Please try again.")]
    Chat,
    #[error(transparent)]
    Port(#[from] PortError),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

pub struct Workspace {
    store: NamespacedStore,
    model: Arc<dyn CompletionService>,
    summarizing: AtomicBool,
}

/// Clears the in-flight flag when a summarize call ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Workspace {
    pub fn new(store: NamespacedStore, model: Arc<dyn CompletionService>) -> Self {
        Self {
            store,
            model,
            summarizing: AtomicBool::new(false),
        }
    }

    //=====================================================================================
    // Session
    //=====================================================================================

    pub fn identity(&self) -> WorkspaceResult<Identity> {
        let token = self.store.raw().get(AUTH_TOKEN_KEY)?;
        Ok(derive_identity(token.as_deref()))
    }

    pub fn sign_in(&self, session: &AuthSession) -> WorkspaceResult<Identity> {
        self.store.raw().set(AUTH_TOKEN_KEY, &session.token)?;
        let identity = self.identity()?;
        info!("Signed in as {}", identity.display_name());
        Ok(identity)
    }

    /// Discards the session token. Saved collections stay in place.
    pub fn sign_out(&self) -> WorkspaceResult<()> {
        self.store.raw().remove(AUTH_TOKEN_KEY)?;
        Ok(())
    }

    fn namespace(&self) -> WorkspaceResult<String> {
        Ok(self.identity()?.namespace().to_string())
    }

    //=====================================================================================
    // Summaries
    //=====================================================================================

    /// Newest first.
    pub fn summaries(&self) -> WorkspaceResult<Vec<SummaryRecord>> {
        let ns = self.namespace()?;
        Ok(self.store.load(Collection::Summaries, Some(&ns))?)
    }

    pub fn summary(&self, id: i64) -> WorkspaceResult<SummaryRecord> {
        self.summaries()?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or(WorkspaceError::SummaryNotFound(id))
    }

    /// Summarizes `text` with the model and stores the result at the front of
    /// the namespace's summaries. If a space is active the new record joins it
    /// in the same write.
    pub async fn summarize(&self, text: &str) -> WorkspaceResult<SummaryRecord> {
        if text.trim().is_empty() {
            return Err(WorkspaceError::EmptyInput);
        }
        if self
            .summarizing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkspaceError::Busy);
        }
        let _guard = InFlight(&self.summarizing);

        let raw = self
            .model
            .complete(SUMMARY_SYSTEM, &summary_prompt(text))
            .await
            .map_err(|e| {
                error!("Summarization request failed: {:?}", e);
                WorkspaceError::Summarize
            })?;
        let fields = parse_summary_response(&raw);

        // Re-read after the await so a concurrent writer's records are kept.
        let ns = self.namespace()?;
        let mut summaries: Vec<SummaryRecord> = self.store.load(Collection::Summaries, Some(&ns))?;
        let record = SummaryRecord {
            id: unique_id(&summaries),
            original_text: text.to_string(),
            overview: fields.overview,
            takeaways: fields.takeaways,
            keywords: fields.keywords,
            created_at: Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        };
        summaries.insert(0, record.clone());

        let mut batch = self.store.batch().save(Collection::Summaries, Some(&ns), &summaries)?;
        if let Some(active) = self.active_space_id(&ns)? {
            let mut spaces: Vec<Space> = self.store.load(Collection::Spaces, Some(&ns))?;
            if let Some(space) = spaces.iter_mut().find(|s| s.id == active) {
                space.summary_ids.push(record.id);
                batch = batch.save(Collection::Spaces, Some(&ns), &spaces)?;
            }
        }
        batch.commit()?;

        info!("Stored summary {} for {}", record.id, ns);
        Ok(record)
    }

    /// Removes every summary in the namespace and drops them from all spaces.
    pub fn clear_summaries(&self) -> WorkspaceResult<()> {
        let ns = self.namespace()?;
        let mut spaces: Vec<Space> = self.store.load(Collection::Spaces, Some(&ns))?;
        for space in &mut spaces {
            space.summary_ids.clear();
        }
        self.store
            .batch()
            .clear(Collection::Summaries, Some(&ns))
            .save(Collection::Spaces, Some(&ns), &spaces)?
            .commit()?;
        Ok(())
    }

    //=====================================================================================
    // Spaces
    //=====================================================================================

    pub fn spaces(&self) -> WorkspaceResult<Vec<Space>> {
        let ns = self.namespace()?;
        Ok(self.store.load(Collection::Spaces, Some(&ns))?)
    }

    pub fn create_space(&self, name: &str) -> WorkspaceResult<Space> {
        if name.trim().is_empty() {
            return Err(WorkspaceError::EmptySpaceName);
        }
        let ns = self.namespace()?;
        let space = Space::new(name);
        self.store.append(Collection::Spaces, Some(&ns), space.clone())?;
        Ok(space)
    }

    pub fn delete_space(&self, id: Uuid) -> WorkspaceResult<()> {
        let ns = self.namespace()?;
        let mut spaces: Vec<Space> = self.store.load(Collection::Spaces, Some(&ns))?;
        let before = spaces.len();
        spaces.retain(|s| s.id != id);
        if spaces.len() == before {
            return Err(WorkspaceError::SpaceNotFound(id));
        }

        let mut batch = self.store.batch().save(Collection::Spaces, Some(&ns), &spaces)?;
        if self.active_space_id(&ns)? == Some(id) {
            batch = batch.clear(Collection::ActiveSpace, Some(&ns));
        }
        batch.commit()?;
        Ok(())
    }

    /// Puts a summary into a space, taking it out of any other space first.
    pub fn add_to_space(&self, space_id: Uuid, summary_id: i64) -> WorkspaceResult<Space> {
        let ns = self.namespace()?;
        let summaries: Vec<SummaryRecord> = self.store.load(Collection::Summaries, Some(&ns))?;
        if !summaries.iter().any(|s| s.id == summary_id) {
            return Err(WorkspaceError::SummaryNotFound(summary_id));
        }

        let mut spaces: Vec<Space> = self.store.load(Collection::Spaces, Some(&ns))?;
        if !spaces.iter().any(|s| s.id == space_id) {
            return Err(WorkspaceError::SpaceNotFound(space_id));
        }
        for space in &mut spaces {
            space.summary_ids.retain(|id| *id != summary_id);
        }
        let mut updated = None;
        for space in &mut spaces {
            if space.id == space_id {
                space.summary_ids.push(summary_id);
                updated = Some(space.clone());
            }
        }

        self.store.save(Collection::Spaces, Some(&ns), &spaces)?;
        updated.ok_or(WorkspaceError::SpaceNotFound(space_id))
    }

    /// Points new summaries at a space, or at none.
    pub fn set_active_space(&self, id: Option<Uuid>) -> WorkspaceResult<()> {
        let ns = self.namespace()?;
        match id {
            Some(id) => {
                let spaces: Vec<Space> = self.store.load(Collection::Spaces, Some(&ns))?;
                if !spaces.iter().any(|s| s.id == id) {
                    return Err(WorkspaceError::SpaceNotFound(id));
                }
                self.store.save_value(Collection::ActiveSpace, Some(&ns), &id)?;
            }
            None => self.store.clear(Collection::ActiveSpace, Some(&ns))?,
        }
        Ok(())
    }

    pub fn active_space(&self) -> WorkspaceResult<Option<Space>> {
        let ns = self.namespace()?;
        let Some(id) = self.active_space_id(&ns)? else {
            return Ok(None);
        };
        let spaces: Vec<Space> = self.store.load(Collection::Spaces, Some(&ns))?;
        Ok(spaces.into_iter().find(|s| s.id == id))
    }

    fn active_space_id(&self, ns: &str) -> WorkspaceResult<Option<Uuid>> {
        Ok(self.store.load_value(Collection::ActiveSpace, Some(ns))?)
    }

    //=====================================================================================
    // Conversation
    //=====================================================================================

    /// Newest first.
    pub fn chat_history(&self, summary_id: i64) -> WorkspaceResult<Vec<ChatMessage>> {
        Ok(self.store.load(Collection::Chat, Some(&summary_id.to_string()))?)
    }

    /// Records the question, asks the model about the summary, and records the reply.
    /// The question stays in the transcript even when the model call fails.
    pub async fn ask(&self, summary_id: i64, question: &str) -> WorkspaceResult<ChatMessage> {
        if question.trim().is_empty() {
            return Err(WorkspaceError::EmptyQuestion);
        }
        let record = self.summary(summary_id)?;
        let scope = summary_id.to_string();

        let history: Vec<ChatMessage> = self.store.load(Collection::Chat, Some(&scope))?;
        let prompt = chat_prompt(&record, &history, question.trim());
        self.store.append(
            Collection::Chat,
            Some(&scope),
            ChatMessage::new(ChatRole::User, question.trim()),
        )?;

        let reply = self
            .model
            .complete(CHAT_SYSTEM, &prompt)
            .await
            .map_err(|e| {
                error!("Chat request failed: {:?}", e);
                WorkspaceError::Chat
            })?;

        let message = ChatMessage::new(ChatRole::Assistant, reply.trim());
        self.store.append(Collection::Chat, Some(&scope), message.clone())?;
        Ok(message)
    }

    //=====================================================================================
    // Flashcards
    //=====================================================================================

    pub fn flashcards(&self, summary_id: i64) -> WorkspaceResult<Vec<Flashcard>> {
        Ok(self.store.load(Collection::Flashcards, Some(&summary_id.to_string()))?)
    }

    /// Generates a fresh deck, replacing any stored one.
    pub async fn generate_flashcards(&self, summary_id: i64) -> WorkspaceResult<Vec<Flashcard>> {
        let record = self.summary(summary_id)?;

        let raw = self
            .model
            .complete(FLASHCARD_SYSTEM, &flashcard_prompt(&record))
            .await
            .map_err(|e| {
                error!("Flashcard request failed: {:?}", e);
                WorkspaceError::Flashcards
            })?;
        let cards = parse_flashcards(&raw).map_err(|e| {
            error!("Failed to parse flashcards: {:?}", e);
            WorkspaceError::Flashcards
        })?;

        self.store
            .save(Collection::Flashcards, Some(&summary_id.to_string()), &cards)?;
        Ok(cards)
    }

    //=====================================================================================
    // Notes
    //=====================================================================================

    /// The editable notes for a summary, defaulting to its original text.
    pub fn notes(&self, summary_id: i64) -> WorkspaceResult<String> {
        let record = self.summary(summary_id)?;
        Ok(self
            .store
            .load_text(Collection::Notes, Some(&summary_id.to_string()))?
            .unwrap_or(record.original_text))
    }

    pub fn set_notes(&self, summary_id: i64, notes: &str) -> WorkspaceResult<()> {
        self.summary(summary_id)?;
        self.store
            .save_text(Collection::Notes, Some(&summary_id.to_string()), notes)?;
        Ok(())
    }

    pub fn notes_title(&self, summary_id: i64) -> WorkspaceResult<String> {
        let record = self.summary(summary_id)?;
        if let Some(title) = self
            .store
            .load_text(Collection::NotesTitle, Some(&summary_id.to_string()))?
        {
            return Ok(title);
        }
        Ok(default_title(&record.original_text))
    }

    pub fn set_notes_title(&self, summary_id: i64, title: &str) -> WorkspaceResult<()> {
        self.summary(summary_id)?;
        self.store
            .save_text(Collection::NotesTitle, Some(&summary_id.to_string()), title)?;
        Ok(())
    }
}

/// Millisecond timestamp, bumped past any id already in use.
fn unique_id(existing: &[SummaryRecord]) -> i64 {
    let mut id = Utc::now().timestamp_millis();
    while existing.iter().any(|s| s.id == id) {
        id += 1;
    }
    id
}

fn default_title(text: &str) -> String {
    let title: String = text.chars().take(NOTES_TITLE_CHARS).collect();
    let title = title.trim();
    if title.is_empty() {
        DEFAULT_NOTES_TITLE.to_string()
    } else {
        title.to_string()
    }
}
