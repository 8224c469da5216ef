//! Single-shot questions
//!
//! A quick ask sends one message with no transcript, shows the answer,
//! and prepends the exchange to the persisted ask history. It does not
//! count against the daily allowance.

use super::history::{AskHistory, AskRecord};
use super::prompts::PromptLibrary;
use super::session::Rejection;
use crate::context::AppContext;
use crate::notice::Notice;
use crate::providers::{normalize_payload, ChatProvider, ChatTurn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// How a quick ask ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    Answered(AskRecord),
    Failed(String),
    Rejected(Rejection),
}

pub struct QuickAsk {
    ctx: AppContext,
    provider: Arc<dyn ChatProvider>,
    loading: AtomicBool,
    history: Mutex<AskHistory>,
}

impl QuickAsk {
    pub fn new(ctx: AppContext, provider: Arc<dyn ChatProvider>) -> Self {
        let history = AskHistory::load(ctx.store.as_ref());
        Self {
            ctx,
            provider,
            loading: AtomicBool::new(false),
            history: Mutex::new(history),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn history(&self) -> AskHistory {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send `message` on its own and record the exchange on success
    pub async fn ask(&self, message: &str) -> AskOutcome {
        if message.trim().is_empty() {
            self.ctx.notify(Notice::warning("Please enter a message"));
            return AskOutcome::Rejected(Rejection::EmptyMessage);
        }
        if self.loading.swap(true, Ordering::SeqCst) {
            self.ctx.notify(Notice::warning(
                "Please wait for the current request to complete",
            ));
            return AskOutcome::Rejected(Rejection::InFlight);
        }

        let loading = LoadingGuard(&self.loading);

        let api_key = self.ctx.api_key();
        let result = self
            .provider
            .send(&[ChatTurn::user(message)], api_key.as_deref())
            .await;
        drop(loading);

        let response = match result {
            Ok(response) if response.is_success() => response,
            Ok(response) => return self.fail(response.error_text()),
            Err(e) => return self.fail(e.to_string()),
        };

        let record = AskRecord {
            message: message.to_string(),
            response: normalize_payload(&response.data),
            created_at: self.ctx.clock.now(),
        };

        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            history.record(record.clone());
            history.save(self.ctx.store.as_ref());
        }

        let store = self.ctx.store.as_ref();
        let mut prompts = PromptLibrary::load(store, self.ctx.config.prompts.recent_limit);
        if prompts.record_recent().is_some() {
            prompts.save(store);
        }

        tracing::info!("Quick ask answered ({} chars)", record.response.len());
        AskOutcome::Answered(record)
    }

    fn fail(&self, text: String) -> AskOutcome {
        tracing::warn!("Quick ask failed: {}", text);
        self.ctx.notify(Notice::error(text.clone()));
        AskOutcome::Failed(text)
    }
}

/// Resets the loading flag when the ask finishes or is dropped
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
