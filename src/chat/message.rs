//! Chat messages and their identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a conversation
///
/// Messages are never edited in place. Editing or regenerating replaces
/// list membership instead, so a message's fields are fixed once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Creation time in milliseconds, unique within a session
    pub id: i64,
    /// Author
    #[serde(rename = "type")]
    pub role: Role,
    /// Text
    pub content: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Hands out message ids
///
/// Ids are the creation timestamp in milliseconds. Two messages built in
/// the same millisecond (or after the clock stepped back) get the previous
/// id plus one, keeping ids unique and non-decreasing.
#[derive(Debug, Default)]
pub struct MessageFactory {
    last_id: i64,
}

impl MessageFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a user message created at `now`
    pub fn user(&mut self, content: impl Into<String>, now: DateTime<Utc>) -> Message {
        self.build(Role::User, content.into(), now)
    }

    /// Build an assistant message created at `now`
    pub fn assistant(&mut self, content: impl Into<String>, now: DateTime<Utc>) -> Message {
        self.build(Role::Assistant, content.into(), now)
    }

    fn build(&mut self, role: Role, content: String, now: DateTime<Utc>) -> Message {
        let millis = now.timestamp_millis();
        let id = if millis > self.last_id {
            millis
        } else {
            self.last_id + 1
        };
        self.last_id = id;

        Message {
            id,
            role,
            content,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ids_follow_timestamp() {
        let mut factory = MessageFactory::new();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let msg = factory.user("hi", now);
        assert_eq!(msg.id, 1_700_000_000_000);
        assert!(msg.is_user());
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let mut factory = MessageFactory::new();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let a = factory.user("a", now);
        let b = factory.assistant("b", now);
        let c = factory.user("c", now - chrono::Duration::seconds(5));

        assert_eq!(b.id, a.id + 1);
        assert_eq!(c.id, b.id + 1);
        assert!(b.is_assistant());
    }

    #[test]
    fn test_message_serializes_with_frontend_field_names() {
        let mut factory = MessageFactory::new();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let value = serde_json::to_value(factory.assistant("ok", now)).unwrap();

        assert_eq!(value["type"], "assistant");
        assert_eq!(value["content"], "ok");
        assert!(value.get("createdAt").is_some());
    }
}
