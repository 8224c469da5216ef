//! Archived conversations and quick-ask history
//!
//! Both lists are newest-first and persisted as JSON arrays.

use super::conversation::Conversation;
use crate::storage::{keys, load_json, save_json, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of archiving a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Nothing to archive
    Empty,
    /// An archived session already has the same contents
    Duplicate,
    /// Prepended to the archive
    Archived,
}

/// Finished conversations, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatArchive {
    sessions: Vec<Conversation>,
}

impl ChatArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the archive, falling back to an empty one
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json(store, keys::CHAT_HISTORY_LIST).unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        save_json(store, keys::CHAT_HISTORY_LIST, self);
    }

    pub fn sessions(&self) -> &[Conversation] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Prepend `conversation` unless it is empty or already archived
    ///
    /// Two conversations are the same when they have equal length and
    /// equal content at every position; ids and timestamps are ignored.
    pub fn archive(&mut self, conversation: Conversation) -> ArchiveOutcome {
        if conversation.is_empty() {
            return ArchiveOutcome::Empty;
        }

        if self
            .sessions
            .iter()
            .any(|existing| existing.same_contents(&conversation))
        {
            tracing::debug!("Conversation already archived, discarding");
            return ArchiveOutcome::Duplicate;
        }

        self.sessions.insert(0, conversation);
        ArchiveOutcome::Archived
    }

    /// Remove the session at `index`
    pub fn delete(&mut self, index: usize) -> Option<Conversation> {
        (index < self.sessions.len()).then(|| self.sessions.remove(index))
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Sessions with any message containing `keyword` (case-insensitive)
    ///
    /// Each hit is paired with its index in the archive. A blank keyword
    /// matches everything.
    pub fn search(&self, keyword: &str) -> Vec<(usize, &Conversation)> {
        let keyword = keyword.trim().to_lowercase();
        self.sessions
            .iter()
            .enumerate()
            .filter(|(_, session)| {
                keyword.is_empty()
                    || session
                        .messages()
                        .iter()
                        .any(|m| m.content.to_lowercase().contains(&keyword))
            })
            .collect()
    }
}

/// A single quick-ask exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRecord {
    pub message: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// Quick-ask exchanges, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AskHistory {
    records: Vec<AskRecord>,
}

impl AskHistory {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json(store, keys::ASK_HISTORY_LIST).unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        save_json(store, keys::ASK_HISTORY_LIST, self);
    }

    pub fn records(&self) -> &[AskRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&mut self, record: AskRecord) {
        self.records.insert(0, record);
    }

    pub fn delete(&mut self, index: usize) -> Option<AskRecord> {
        (index < self.records.len()).then(|| self.records.remove(index))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records whose question or answer contains `keyword` (case-insensitive)
    pub fn search(&self, keyword: &str) -> Vec<(usize, &AskRecord)> {
        let keyword = keyword.trim().to_lowercase();
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                keyword.is_empty()
                    || r.message.to_lowercase().contains(&keyword)
                    || r.response.to_lowercase().contains(&keyword)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::MessageFactory;
    use crate::storage::MemoryStore;

    fn conv(factory: &mut MessageFactory, contents: &[&str]) -> Conversation {
        let now = Utc::now();
        Conversation::from_messages(contents.iter().map(|c| factory.user(*c, now)).collect())
    }

    #[test]
    fn test_archive_empty_is_noop() {
        let mut archive = ChatArchive::new();
        assert_eq!(archive.archive(Conversation::new()), ArchiveOutcome::Empty);
        assert!(archive.is_empty());
    }

    #[test]
    fn test_archive_prepends() {
        let mut factory = MessageFactory::new();
        let mut archive = ChatArchive::new();
        archive.archive(conv(&mut factory, &["first"]));
        archive.archive(conv(&mut factory, &["second"]));

        assert_eq!(archive.sessions()[0].messages()[0].content, "second");
        assert_eq!(archive.sessions()[1].messages()[0].content, "first");
    }

    #[test]
    fn test_archive_never_duplicates_contents() {
        let mut factory = MessageFactory::new();
        let mut archive = ChatArchive::new();

        assert_eq!(
            archive.archive(conv(&mut factory, &["q", "a"])),
            ArchiveOutcome::Archived
        );
        // different ids, same contents
        assert_eq!(
            archive.archive(conv(&mut factory, &["q", "a"])),
            ArchiveOutcome::Duplicate
        );
        // prefix is not a duplicate
        assert_eq!(
            archive.archive(conv(&mut factory, &["q"])),
            ArchiveOutcome::Archived
        );
        assert_eq!(archive.len(), 2);

        for (i, a) in archive.sessions().iter().enumerate() {
            for b in &archive.sessions()[i + 1..] {
                assert!(!a.same_contents(b));
            }
        }
    }

    #[test]
    fn test_archive_delete_clear_search() {
        let mut factory = MessageFactory::new();
        let mut archive = ChatArchive::new();
        archive.archive(conv(&mut factory, &["Rust ownership", "borrowing"]));
        archive.archive(conv(&mut factory, &["weather today"]));

        let hits = archive.search("RUST");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 1);
        assert_eq!(archive.search("  ").len(), 2);

        assert!(archive.delete(5).is_none());
        assert!(archive.delete(0).is_some());
        assert_eq!(archive.len(), 1);

        archive.clear();
        assert!(archive.is_empty());
    }

    #[test]
    fn test_archive_persistence() {
        let store = MemoryStore::new();
        let mut factory = MessageFactory::new();
        let mut archive = ChatArchive::load(&store);
        assert!(archive.is_empty());

        archive.archive(conv(&mut factory, &["kept"]));
        archive.save(&store);

        assert_eq!(ChatArchive::load(&store), archive);
    }

    #[test]
    fn test_ask_history_search_and_delete() {
        let store = MemoryStore::new();
        let mut history = AskHistory::load(&store);
        history.record(AskRecord {
            message: "What is a lifetime?".to_string(),
            response: "A region of code".to_string(),
            created_at: Utc::now(),
        });
        history.record(AskRecord {
            message: "Translate hello".to_string(),
            response: "你好".to_string(),
            created_at: Utc::now(),
        });
        history.save(&store);

        let history = AskHistory::load(&store);
        assert_eq!(history.len(), 2);
        assert_eq!(history.records()[0].message, "Translate hello");
        assert_eq!(history.search("region").len(), 1);
        assert_eq!(history.search("你好")[0].0, 0);

        let mut history = history;
        assert!(history.delete(1).is_some());
        assert_eq!(history.len(), 1);
        history.clear();
        assert!(history.is_empty());
    }
}
