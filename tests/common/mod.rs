use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use popask::clock::ManualClock;
use popask::config::Config;
use popask::context::AppContext;
use popask::error::{PopAskError, Result};
use popask::notice::NoticeLog;
use popask::providers::{ChatProvider, ChatResponse, ChatTurn};
use popask::selection::WindowPort;
use popask::storage::MemoryStore;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::oneshot;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config with the given daily limit and defaults elsewhere
#[allow(dead_code)]
pub fn config_with_limit(daily_limit: u32) -> Config {
    let mut config = Config::default();
    config.usage.daily_limit = daily_limit;
    config
}

/// In-memory context with a manual clock and a notice log
#[allow(dead_code)]
pub fn test_context(config: Config) -> (AppContext, NoticeLog, Arc<ManualClock>) {
    let notices = NoticeLog::new();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap(),
    ));
    let ctx = AppContext::new(
        config,
        Arc::new(MemoryStore::new()),
        clock.clone(),
        Arc::new(notices.clone()),
    );
    (ctx, notices, clock)
}

enum Reply {
    Now(ChatResponse),
    Later(oneshot::Receiver<ChatResponse>),
    Fail(String),
}

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub transcript: Vec<ChatTurn>,
    pub api_key: Option<String>,
}

/// Chat provider answering from a queue of replies
///
/// Deferred replies resolve when the test sends on the returned channel.
#[derive(Default)]
pub struct StubProvider {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, text: &str) {
        self.push(Reply::Now(ChatResponse::ok(text)));
    }

    pub fn respond(&self, response: ChatResponse) {
        self.push(Reply::Now(response));
    }

    pub fn fail(&self, error: &str) {
        self.push(Reply::Fail(error.to_string()));
    }

    /// Queue a reply that resolves when the returned sender fires
    pub fn deferred(&self) -> oneshot::Sender<ChatResponse> {
        let (tx, rx) = oneshot::channel();
        self.push(Reply::Later(rx));
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Yield until `count` calls were made
    pub async fn wait_for_calls(&self, count: usize) {
        while self.calls.lock().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }

    fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl ChatProvider for StubProvider {
    async fn send(&self, transcript: &[ChatTurn], api_key: Option<&str>) -> Result<ChatResponse> {
        self.calls.lock().unwrap().push(Call {
            transcript: transcript.to_vec(),
            api_key: api_key.map(str::to_string),
        });
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Now(response)) => Ok(response),
            Some(Reply::Later(rx)) => rx
                .await
                .map_err(|_| PopAskError::Provider("deferred reply dropped".to_string()).into()),
            Some(Reply::Fail(error)) => Err(PopAskError::Provider(error).into()),
            None => Err(PopAskError::Provider("no reply queued".to_string()).into()),
        }
    }
}

/// Window port counting calls
#[derive(Default)]
pub struct CountingWindow {
    pub shows: AtomicUsize,
    pub focuses: AtomicUsize,
}

#[allow(dead_code)]
impl CountingWindow {
    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    pub fn focuses(&self) -> usize {
        self.focuses.load(Ordering::SeqCst)
    }
}

impl WindowPort for CountingWindow {
    fn show_and_center(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }

    fn focus_input(&self) {
        self.focuses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Contents of a conversation, oldest first
#[allow(dead_code)]
pub fn contents(conversation: &popask::chat::Conversation) -> Vec<String> {
    conversation
        .messages()
        .iter()
        .map(|m| m.content.clone())
        .collect()
}
