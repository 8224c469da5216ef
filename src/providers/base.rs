//! Chat provider trait and the response envelope
//!
//! This module defines the [`ChatProvider`] trait the request lifecycle
//! dispatches through, the role-tagged turn it sends, and the
//! `{code, data, message}` envelope it gets back.

use crate::chat::message::{Message, Role};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope code that marks a successful completion
pub const SUCCESS_CODE: i64 = 200;

/// One role-tagged entry of the transcript sent to the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Response envelope of the chat endpoint
///
/// `code == 200` is success and `data` holds the completion. Any other
/// code is a failure and `data` (or `message`) holds a readable error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub code: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: String,
}

impl ChatResponse {
    /// Successful envelope carrying `data`
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            code: SUCCESS_CODE,
            data: data.into(),
            message: "ok".to_string(),
        }
    }

    /// Failed envelope with a readable error in `data`
    pub fn failure(code: i64, error: impl Into<String>) -> Self {
        Self {
            code,
            data: Value::String(error.into()),
            message: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Text to show the user for a failed envelope
    pub fn error_text(&self) -> String {
        match &self.data {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Null | Value::String(_) if !self.message.is_empty() => self.message.clone(),
            Value::Null | Value::String(_) => format!("Request failed with code {}", self.code),
            other => other.to_string(),
        }
    }
}

/// Remote chat-completion endpoint
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send the full transcript and return the response envelope
    ///
    /// # Arguments
    ///
    /// * `transcript` - Role-tagged conversation, oldest first
    /// * `api_key` - User-supplied API key, if any
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or an unreadable response. A
    /// readable envelope with a non-200 code is returned as `Ok`.
    async fn send(&self, transcript: &[ChatTurn], api_key: Option<&str>) -> Result<ChatResponse>;
}

/// Turn a response payload into message text
///
/// A string payload is parsed as JSON first: an object with a `content`
/// field yields that field, anything else keeps the string verbatim. An
/// object with `content` yields the field; other values are stringified
/// and `null` becomes the empty string.
///
/// # Examples
///
/// ```
/// use popask::providers::normalize_payload;
/// use serde_json::json;
///
/// assert_eq!(normalize_payload(&json!("plain")), "plain");
/// assert_eq!(normalize_payload(&json!("{\"content\":\"wrapped\"}")), "wrapped");
/// assert_eq!(normalize_payload(&json!({"content": "object"})), "object");
/// ```
pub fn normalize_payload(data: &Value) -> String {
    match data {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => match map.get("content") {
                Some(content) => content_text(content),
                None => raw.clone(),
            },
            _ => raw.clone(),
        },
        Value::Object(map) => match map.get("content") {
            Some(content) => content_text(content),
            None => data.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
