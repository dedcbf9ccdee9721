//! crates/sage_core/src/store.rs
//!
//! Namespaced persistence on top of a `KeyValueStore`.
//!
//! Every collection lives under a single key of the form `{collection}:{scope}`,
//! where the scope is a namespace key (summaries, spaces, active space) or a
//! conversation id (chat, notes, flashcards). Values are whole JSON documents;
//! writes replace, never merge.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::identity::GUEST_NAMESPACE;
use crate::ports::{KeyValueStore, PortError, PortResult, WriteOp};

/// The key under which the client keeps its session token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Summaries,
    Spaces,
    ActiveSpace,
    Chat,
    Notes,
    NotesTitle,
    Flashcards,
}

impl Collection {
    pub fn prefix(&self) -> &'static str {
        match self {
            Collection::Summaries => "summaries",
            Collection::Spaces => "spaces",
            Collection::ActiveSpace => "activeSpace",
            Collection::Chat => "chat",
            Collection::Notes => "notes",
            Collection::NotesTitle => "notes-title",
            Collection::Flashcards => "flashcards",
        }
    }

    /// Builds `{collection}:{scope}`, using the guest namespace when no scope is given.
    pub fn key(&self, scope: Option<&str>) -> String {
        format!("{}:{}", self.prefix(), scope.unwrap_or(GUEST_NAMESPACE))
    }
}

/// CRUD over JSON-encoded collections, partitioned by scope.
#[derive(Clone)]
pub struct NamespacedStore {
    kv: Arc<dyn KeyValueStore>,
}

impl NamespacedStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Reads a list. Absent or malformed payloads read as empty.
    pub fn load<T: DeserializeOwned>(
        &self,
        collection: Collection,
        scope: Option<&str>,
    ) -> PortResult<Vec<T>> {
        Ok(self.load_value(collection, scope)?.unwrap_or_default())
    }

    /// Reads any JSON value. Absent or malformed payloads read as `None`.
    pub fn load_value<T: DeserializeOwned>(
        &self,
        collection: Collection,
        scope: Option<&str>,
    ) -> PortResult<Option<T>> {
        let key = collection.key(scope);
        let Some(raw) = self.kv.get(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Ignoring malformed value at '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    /// Replaces the whole list.
    pub fn save<T: Serialize>(
        &self,
        collection: Collection,
        scope: Option<&str>,
        items: &[T],
    ) -> PortResult<()> {
        self.save_value(collection, scope, &items)
    }

    pub fn save_value<T: Serialize + ?Sized>(
        &self,
        collection: Collection,
        scope: Option<&str>,
        value: &T,
    ) -> PortResult<()> {
        let raw = encode(value)?;
        self.kv.set(&collection.key(scope), &raw)
    }

    /// Puts `item` at the front of the list and returns the stored list.
    pub fn append<T: Serialize + DeserializeOwned>(
        &self,
        collection: Collection,
        scope: Option<&str>,
        item: T,
    ) -> PortResult<Vec<T>> {
        let mut items: Vec<T> = self.load(collection, scope)?;
        items.insert(0, item);
        self.save(collection, scope, &items)?;
        Ok(items)
    }

    pub fn clear(&self, collection: Collection, scope: Option<&str>) -> PortResult<()> {
        self.kv.remove(&collection.key(scope))
    }

    /// Reads a raw string value without JSON decoding.
    pub fn load_text(
        &self,
        collection: Collection,
        scope: Option<&str>,
    ) -> PortResult<Option<String>> {
        self.kv.get(&collection.key(scope))
    }

    pub fn save_text(
        &self,
        collection: Collection,
        scope: Option<&str>,
        text: &str,
    ) -> PortResult<()> {
        self.kv.set(&collection.key(scope), text)
    }

    pub fn batch(&self) -> StoreBatch<'_> {
        StoreBatch {
            store: self,
            ops: Vec::new(),
        }
    }

    /// The substrate itself, for values outside any collection (the session token).
    pub fn raw(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }
}

/// Collects writes across several collections and commits them in one step.
pub struct StoreBatch<'a> {
    store: &'a NamespacedStore,
    ops: Vec<WriteOp>,
}

impl StoreBatch<'_> {
    pub fn save<T: Serialize + ?Sized>(
        mut self,
        collection: Collection,
        scope: Option<&str>,
        value: &T,
    ) -> PortResult<Self> {
        self.ops.push(WriteOp::Set {
            key: collection.key(scope),
            value: encode(value)?,
        });
        Ok(self)
    }

    pub fn clear(mut self, collection: Collection, scope: Option<&str>) -> Self {
        self.ops.push(WriteOp::Remove {
            key: collection.key(scope),
        });
        self
    }

    pub fn commit(self) -> PortResult<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        self.store.kv.apply_batch(self.ops)
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> PortResult<String> {
    serde_json::to_string(value).map_err(|e| PortError::Unexpected(e.to_string()))
}

//=========================================================================================
// In-memory substrate
//=========================================================================================

/// A `KeyValueStore` held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Unexpected("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn apply_batch(&self, ops: Vec<WriteOp>) -> PortResult<()> {
        let mut entries = self.lock()?;
        for op in ops {
            match op {
                WriteOp::Set { key, value } => {
                    entries.insert(key, value);
                }
                WriteOp::Remove { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatMessage, ChatRole};
    use pretty_assertions::assert_eq;

    fn store() -> (Arc<MemoryStore>, NamespacedStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), NamespacedStore::new(kv))
    }

    #[test]
    fn keys_follow_collection_layout() {
        assert_eq!(Collection::Summaries.key(Some("a@b.c")), "summaries:a@b.c");
        assert_eq!(Collection::Spaces.key(None), "spaces:anon");
        assert_eq!(Collection::ActiveSpace.key(Some("x")), "activeSpace:x");
        assert_eq!(Collection::Chat.key(Some("17")), "chat:17");
        assert_eq!(Collection::NotesTitle.key(Some("17")), "notes-title:17");
    }

    #[test]
    fn append_puts_newest_first() {
        let (_, store) = store();
        store.append(Collection::Summaries, Some("ns"), 1_i64).unwrap();
        let before: Vec<i64> = store.load(Collection::Summaries, Some("ns")).unwrap();

        store.append(Collection::Summaries, Some("ns"), 2_i64).unwrap();
        let after: Vec<i64> = store.load(Collection::Summaries, Some("ns")).unwrap();

        assert_eq!(after[0], 2);
        assert_eq!(after.len(), before.len() + 1);
    }

    #[test]
    fn clear_then_load_is_empty() {
        let (kv, store) = store();
        store.save(Collection::Spaces, Some("ns"), &[1, 2, 3]).unwrap();
        store.clear(Collection::Spaces, Some("ns")).unwrap();

        let items: Vec<i32> = store.load(Collection::Spaces, Some("ns")).unwrap();
        assert!(items.is_empty());
        assert_eq!(kv.get("spaces:ns").unwrap(), None);
    }

    #[test]
    fn malformed_payload_reads_as_empty() {
        let (kv, store) = store();
        kv.set("chat:9", "{not json").unwrap();
        let messages: Vec<ChatMessage> = store.load(Collection::Chat, Some("9")).unwrap();
        assert!(messages.is_empty());

        let appended = store
            .append(Collection::Chat, Some("9"), ChatMessage::new(ChatRole::User, "hi"))
            .unwrap();
        assert_eq!(appended.len(), 1);
    }

    #[test]
    fn namespaces_do_not_share_collections() {
        let (_, store) = store();
        store.append(Collection::Summaries, Some("alice"), 1_i64).unwrap();
        let bob: Vec<i64> = store.load(Collection::Summaries, Some("bob")).unwrap();
        let guest: Vec<i64> = store.load(Collection::Summaries, None).unwrap();
        assert!(bob.is_empty());
        assert!(guest.is_empty());
    }

    #[test]
    fn batch_commits_every_write() {
        let (kv, store) = store();
        kv.set("activeSpace:ns", "\"old\"").unwrap();

        store
            .batch()
            .save(Collection::Summaries, Some("ns"), &[1_i64])
            .unwrap()
            .save(Collection::Spaces, Some("ns"), &Vec::<i64>::new())
            .unwrap()
            .clear(Collection::ActiveSpace, Some("ns"))
            .commit()
            .unwrap();

        assert_eq!(kv.get("summaries:ns").unwrap().as_deref(), Some("[1]"));
        assert_eq!(kv.get("spaces:ns").unwrap().as_deref(), Some("[]"));
        assert_eq!(kv.get("activeSpace:ns").unwrap(), None);
    }

    #[test]
    fn text_values_are_stored_raw() {
        let (kv, store) = store();
        store.save_text(Collection::Notes, Some("5"), "plain notes").unwrap();
        assert_eq!(kv.get("notes:5").unwrap().as_deref(), Some("plain notes"));
        assert_eq!(
            store.load_text(Collection::Notes, Some("5")).unwrap().as_deref(),
            Some("plain notes")
        );
    }
}
