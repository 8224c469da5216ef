//! Shared application context
//!
//! Everything the chat lifecycle and the selection binder need from the
//! outside world: configuration, persistence, the clock and the notice
//! sink. Built once at startup and handed to constructors.

use crate::chat::quota::UsageLimiter;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::notice::{Notice, NoticeSink, TracingNotices};
use crate::storage::{keys, load_json, save_json, KeyValueStore, MemoryStore};
use std::sync::Arc;

/// Handles to the collaborators shared across the app
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub notices: Arc<dyn NoticeSink>,
}

impl AppContext {
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            clock,
            notices,
        }
    }

    /// Context over an in-memory store, the system clock and tracing notices
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            Arc::new(TracingNotices),
        )
    }

    /// Usage limiter over this context's store and clock
    pub fn usage_limiter(&self) -> UsageLimiter {
        UsageLimiter::new(self.store.clone(), self.clock.clone())
    }

    pub fn notify(&self, notice: Notice) {
        self.notices.notify(notice);
    }

    /// User-supplied API key, `None` when unset or blank
    pub fn api_key(&self) -> Option<String> {
        load_json::<String>(self.store.as_ref(), keys::OPENAI_API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Store or clear the user API key
    pub fn set_api_key(&self, key: Option<&str>) {
        match key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => save_json(self.store.as_ref(), keys::OPENAI_API_KEY, key),
            None => {
                if let Err(e) = self.store.remove(keys::OPENAI_API_KEY) {
                    tracing::warn!("Failed to clear API key: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_roundtrip() {
        let ctx = AppContext::in_memory(Config::default());
        assert_eq!(ctx.api_key(), None);

        ctx.set_api_key(Some("  sk-test  "));
        assert_eq!(ctx.api_key().as_deref(), Some("sk-test"));

        ctx.set_api_key(Some("   "));
        assert_eq!(ctx.api_key(), None);
    }

    #[test]
    fn test_blank_stored_key_reads_as_none() {
        let ctx = AppContext::in_memory(Config::default());
        ctx.store.set(keys::OPENAI_API_KEY, "\"  \"").unwrap();
        assert_eq!(ctx.api_key(), None);
    }
}
