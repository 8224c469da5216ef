//! Test utilities for PopAsk
//!
//! This module provides common test utilities: an in-memory application
//! context with a fixed clock, a scripted chat provider, and assertion
//! helpers.

use crate::clock::ManualClock;
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{PopAskError, Result};
use crate::notice::NoticeLog;
use crate::providers::{ChatProvider, ChatResponse, ChatTurn};
use crate::storage::MemoryStore;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Context over a fresh in-memory store, a clock fixed at 2026-05-04 09:00 UTC,
/// and a notice log the test can inspect
pub fn test_context(config: Config) -> (AppContext, NoticeLog) {
    let notices = NoticeLog::new();
    let clock = ManualClock::new(
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0)
            .single()
            .expect("valid timestamp"),
    );
    let ctx = AppContext::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(clock),
        Arc::new(notices.clone()),
    );
    (ctx, notices)
}

/// Provider answering from a queue of canned replies
///
/// Each call pops the next reply and records the transcript it was sent.
/// An exhausted queue answers with a provider error. Stalled calls never
/// answer.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<std::result::Result<ChatResponse, String>>>,
    calls: Mutex<Vec<Vec<ChatTurn>>>,
    stalled: AtomicUsize,
}

impl ScriptedProvider {
    /// Provider answering each call with the next text as a code-200 reply
    pub fn replying(texts: &[&str]) -> Self {
        let provider = Self::default();
        for text in texts {
            provider.push(Ok(ChatResponse::ok(*text)));
        }
        provider
    }

    pub fn push(&self, reply: std::result::Result<ChatResponse, String>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Make the next `count` calls hang without answering
    pub fn stall_next(&self, count: usize) {
        self.stalled.fetch_add(count, Ordering::SeqCst);
    }

    /// Transcripts sent so far, oldest call first
    pub fn calls(&self) -> Vec<Vec<ChatTurn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn send(&self, transcript: &[ChatTurn], _api_key: Option<&str>) -> Result<ChatResponse> {
        self.calls.lock().unwrap().push(transcript.to_vec());
        let stall = self
            .stalled
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stall {
            return std::future::pending().await;
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(error)) => Err(PopAskError::Provider(error).into()),
            None => Err(PopAskError::Provider("no scripted reply".to_string()).into()),
        }
    }
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
endpoint:
  server_url: http://localhost:54321/functions/v1
  openai_base: http://localhost:8080
  model: gpt-4o-mini
  timeout_seconds: 30

usage:
  daily_limit: 2
  low_quota_threshold: 1

prompts:
  recent_limit: 5

selection:
  ocr_timeout_ms: 5000
  focus_delay_ms: 10
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(PopAskError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    fn test_test_config_yaml() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert_eq!(config.usage.daily_limit, 2);
        assert_eq!(config.prompts.recent_limit, 5);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_scripted_provider_pops_in_order() {
        let provider = ScriptedProvider::replying(&["one"]);
        provider.push(Err("boom".to_string()));

        let turns = [ChatTurn::user("q")];
        assert_eq!(provider.send(&turns, None).await.unwrap().data, "one");
        assert_error_contains(provider.send(&turns, None).await, "boom");
        assert_error_contains(provider.send(&turns, None).await, "no scripted reply");
        assert_eq!(provider.calls().len(), 3);
    }
}
