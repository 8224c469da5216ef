//! In-progress conversation and its history mutations
//!
//! All mutations are value-to-value: they take a conversation and return
//! the next one. The session swaps the whole value under its lock, so a
//! reader never observes a half-applied edit.

use super::message::Message;
use serde::{Deserialize, Serialize};

/// Ordered list of messages; insertion order is display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Position of the message with the given id
    pub fn index_of(&self, id: i64) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    /// Whether `index` addresses an existing message
    pub fn contains_index(&self, index: usize) -> bool {
        index < self.messages.len()
    }

    /// Same length and the same content at every position
    pub fn same_contents(&self, other: &Conversation) -> bool {
        self.messages.len() == other.messages.len()
            && self
                .messages
                .iter()
                .zip(&other.messages)
                .all(|(a, b)| a.content == b.content)
    }

    /// Add `message` at the end
    #[must_use]
    pub fn append(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Keep `[0, index)` and append `message`
    ///
    /// Used for edits: the message at `index` and everything after it is
    /// dropped. An `index` past the end leaves the conversation unchanged.
    #[must_use]
    pub fn replace_from(self, index: usize, message: Message) -> Self {
        if !self.contains_index(index) {
            return self;
        }
        self.truncate_to(index).append(message)
    }

    /// Keep `[0, index)` only
    ///
    /// Used for regeneration. An `index` past the end leaves the
    /// conversation unchanged.
    #[must_use]
    pub fn truncate_to(mut self, index: usize) -> Self {
        if self.contains_index(index) {
            self.messages.truncate(index);
        }
        self
    }
}

/// How a dispatch relates to the current conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Append to the current conversation
    Continue,
    /// Discard the current conversation and start with the new message
    NewChat,
    /// Replace the user message at `index` and drop everything after it
    Edit { index: usize },
    /// Drop the reply at `index` and everything after it, then re-send
    Regenerate { index: usize },
}

/// Compute the transcript to dispatch
///
/// | mode | transcript |
/// |---|---|
/// | `NewChat` | `[incoming]` |
/// | `Edit(i)` | `current[0:i] + [incoming]` |
/// | `Regenerate(i)` | `current[0:i]` |
/// | `Continue` | `current + [incoming]` |
///
/// For `Regenerate` the user message being answered again is already the
/// last entry of `current[0:i]`, so `incoming` is not added. Returns `None`
/// when an edit or regenerate index does not address an existing message.
pub fn build_chat_messages(
    current: &Conversation,
    incoming: Message,
    mode: DispatchMode,
) -> Option<Conversation> {
    match mode {
        DispatchMode::NewChat => Some(Conversation::new().append(incoming)),
        DispatchMode::Edit { index } => current
            .contains_index(index)
            .then(|| current.clone().replace_from(index, incoming)),
        DispatchMode::Regenerate { index } => current
            .contains_index(index)
            .then(|| current.clone().truncate_to(index)),
        DispatchMode::Continue => Some(current.clone().append(incoming)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::MessageFactory;
    use chrono::{TimeZone, Utc};

    fn conversation(contents: &[&str]) -> (Conversation, MessageFactory) {
        let mut factory = MessageFactory::new();
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        let messages = contents
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i % 2 == 0 {
                    factory.user(*c, now)
                } else {
                    factory.assistant(*c, now)
                }
            })
            .collect();
        (Conversation::from_messages(messages), factory)
    }

    fn contents(conversation: &Conversation) -> Vec<&str> {
        conversation
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect()
    }

    #[test]
    fn test_append_keeps_order() {
        let (conv, mut factory) = conversation(&["a", "b"]);
        let conv = conv.append(factory.user("c", Utc::now()));
        assert_eq!(contents(&conv), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_replace_from_drops_tail() {
        let (conv, mut factory) = conversation(&["a", "b", "c", "d"]);
        let conv = conv.replace_from(2, factory.user("C", Utc::now()));
        assert_eq!(contents(&conv), vec!["a", "b", "C"]);
    }

    #[test]
    fn test_truncate_to_keeps_prefix() {
        let (conv, _) = conversation(&["a", "b", "c", "d"]);
        assert_eq!(contents(&conv.truncate_to(1)), vec!["a"]);
    }

    #[test]
    fn test_out_of_range_index_is_noop() {
        let (conv, mut factory) = conversation(&["a", "b"]);
        let before = conv.clone();

        assert_eq!(conv.clone().truncate_to(2), before);
        assert_eq!(conv.clone().truncate_to(99), before);
        assert_eq!(conv.replace_from(5, factory.user("x", Utc::now())), before);
    }

    #[test]
    fn test_truncate_then_append_equals_replace_from() {
        let (conv, mut factory) = conversation(&["a", "b", "c", "d", "e"]);
        for index in 0..conv.len() {
            let message = factory.user(format!("m{}", index), Utc::now());
            let left = conv.clone().truncate_to(index).append(message.clone());
            let right = conv.clone().replace_from(index, message);
            assert_eq!(left, right, "index {}", index);
        }
    }

    #[test]
    fn test_index_of_and_same_contents() {
        let (conv, _) = conversation(&["a", "b"]);
        let id = conv.get(1).unwrap().id;
        assert_eq!(conv.index_of(id), Some(1));
        assert_eq!(conv.index_of(-1), None);

        let (other, _) = conversation(&["a", "b"]);
        assert!(conv.same_contents(&other));
        let (shorter, _) = conversation(&["a"]);
        assert!(!conv.same_contents(&shorter));
    }

    #[test]
    fn test_build_chat_messages_modes() {
        let (current, mut factory) = conversation(&["x", "y"]);
        let now = Utc::now();

        let new_chat =
            build_chat_messages(&current, factory.user("n", now), DispatchMode::NewChat).unwrap();
        assert_eq!(contents(&new_chat), vec!["n"]);

        let cont =
            build_chat_messages(&current, factory.user("z", now), DispatchMode::Continue).unwrap();
        assert_eq!(contents(&cont), vec!["x", "y", "z"]);

        let edit = build_chat_messages(
            &current,
            factory.user("x2", now),
            DispatchMode::Edit { index: 0 },
        )
        .unwrap();
        assert_eq!(contents(&edit), vec!["x2"]);

        let regen = build_chat_messages(
            &current,
            factory.user("x", now),
            DispatchMode::Regenerate { index: 1 },
        )
        .unwrap();
        assert_eq!(contents(&regen), vec!["x"]);
    }

    #[test]
    fn test_build_chat_messages_rejects_bad_index() {
        let (current, mut factory) = conversation(&["x", "y"]);
        let now = Utc::now();

        assert!(build_chat_messages(
            &current,
            factory.user("e", now),
            DispatchMode::Edit { index: 2 }
        )
        .is_none());
        assert!(build_chat_messages(
            &current,
            factory.user("e", now),
            DispatchMode::Regenerate { index: 7 }
        )
        .is_none());
    }
}
