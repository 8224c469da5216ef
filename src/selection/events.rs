//! Selection events and the in-process event bus
//!
//! The hotkey collaborator emits a [`SelectionEvent`] under the
//! [`GET_SELECTION`] name. Consumers subscribe by name and get a
//! [`Subscription`] handle; dropping the handle unsubscribes.
//!
//! ```text
//! emit(name, event) -----> handler.tx -----> Subscription::recv()
//! ```
//!
//! Each name has at most one handler. Subscribing again replaces the
//! previous handler, whose subscription then reads end-of-stream.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Event name for captured selections
pub const GET_SELECTION: &str = "GET_SELECTION";

/// Shortcut name that only brings the window up
pub const OPEN_WINDOW_SHORTCUT: &str = "Open Window";

/// Text captured by a hotkey plus how to handle it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionEvent {
    /// Selected text, or an image path when `is_ocr` is set
    pub text: String,
    /// Template bound to the hotkey
    pub prompt: String,
    /// Name of the hotkey
    pub shortcut: String,
    /// Send at once instead of staging
    pub auto_asking: bool,
    /// `text` points at an image to recognize
    #[serde(rename = "isOCR")]
    pub is_ocr: bool,
    /// The hotkey opens the window
    pub is_open_window: bool,
}

impl SelectionEvent {
    /// Plain text selection bound to `prompt`
    pub fn text(text: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Screen capture to recognize
    pub fn ocr(image: impl Into<String>) -> Self {
        Self {
            text: image.into(),
            is_ocr: true,
            ..Self::default()
        }
    }

    /// Bring the window up, nothing else
    pub fn open_window() -> Self {
        Self {
            shortcut: OPEN_WINDOW_SHORTCUT.to_string(),
            is_open_window: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn auto_ask(mut self) -> Self {
        self.auto_asking = true;
        self
    }

    /// Whether the event only asks for the window to be focused
    pub fn is_open_window_only(&self) -> bool {
        self.shortcut == OPEN_WINDOW_SHORTCUT
            || (self.is_open_window && !self.is_ocr && !self.auto_asking)
    }
}

struct Handler {
    token: u64,
    tx: mpsc::UnboundedSender<SelectionEvent>,
}

#[derive(Default)]
struct BusInner {
    handlers: Mutex<HashMap<String, Handler>>,
    next_token: AtomicU64,
}

impl BusInner {
    fn handlers(&self) -> MutexGuard<'_, HashMap<String, Handler>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Name-keyed event bus with one handler per name
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `name`, replacing any existing handler
    pub fn on(&self, name: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);

        if self
            .inner
            .handlers()
            .insert(name.to_string(), Handler { token, tx })
            .is_some()
        {
            tracing::debug!("Replaced handler for {}", name);
        }

        Subscription {
            name: name.to_string(),
            token,
            rx,
            bus: self.inner.clone(),
        }
    }

    /// Deliver `event` to the handler for `name`
    ///
    /// Returns `false` when nobody is subscribed.
    pub fn emit(&self, name: &str, event: SelectionEvent) -> bool {
        let handlers = self.inner.handlers();
        match handlers.get(name) {
            Some(handler) => handler.tx.send(event).is_ok(),
            None => {
                tracing::debug!("No handler for {}, dropping event", name);
                false
            }
        }
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.inner.handlers().contains_key(name)
    }
}

/// Live subscription to one event name
///
/// Dropping it removes the handler, unless a newer subscription has
/// already replaced it.
pub struct Subscription {
    name: String,
    token: u64,
    rx: mpsc::UnboundedReceiver<SelectionEvent>,
    bus: Arc<BusInner>,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next event, or `None` once the subscription was replaced
    pub async fn recv(&mut self) -> Option<SelectionEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SelectionEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut handlers = self.bus.handlers();
        if handlers
            .get(&self.name)
            .is_some_and(|handler| handler.token == self.token)
        {
            handlers.remove(&self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event: SelectionEvent = serde_json::from_str(
            r#"{"text":"hi","prompt":"p\n","shortcut":"Ctrl+1","autoAsking":true,"isOCR":false,"isOpenWindow":false}"#,
        )
        .unwrap();
        assert_eq!(event.text, "hi");
        assert!(event.auto_asking);
        assert!(!event.is_ocr);

        let value = serde_json::to_value(SelectionEvent::ocr("/tmp/shot.png")).unwrap();
        assert_eq!(value["isOCR"], true);
        assert_eq!(value["isOpenWindow"], false);
    }

    #[test]
    fn test_missing_fields_default() {
        let event: SelectionEvent = serde_json::from_str(r#"{"text":"x"}"#).unwrap();
        assert_eq!(event, SelectionEvent::text("x", ""));
    }

    #[test]
    fn test_open_window_only() {
        assert!(SelectionEvent::open_window().is_open_window_only());

        let mut event = SelectionEvent::text("x", "");
        event.is_open_window = true;
        assert!(event.is_open_window_only());
        assert!(!event.clone().auto_ask().is_open_window_only());

        event.is_ocr = true;
        assert!(!event.is_open_window_only());
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber_once() {
        let bus = EventBus::new();
        let mut sub = bus.on(GET_SELECTION);

        assert!(bus.emit(GET_SELECTION, SelectionEvent::text("a", "")));
        assert_eq!(sub.recv().await.unwrap().text, "a");
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_emit_without_subscriber() {
        let bus = EventBus::new();
        assert!(!bus.emit(GET_SELECTION, SelectionEvent::default()));
    }

    #[tokio::test]
    async fn test_resubscribe_replaces_handler() {
        let bus = EventBus::new();
        let mut first = bus.on(GET_SELECTION);
        let mut second = bus.on(GET_SELECTION);

        bus.emit(GET_SELECTION, SelectionEvent::text("b", ""));
        assert_eq!(second.recv().await.unwrap().text, "b");
        assert!(first.recv().await.is_none());

        // dropping the stale handle keeps the newer handler
        drop(first);
        assert!(bus.has_handler(GET_SELECTION));

        drop(second);
        assert!(!bus.has_handler(GET_SELECTION));
    }
}
