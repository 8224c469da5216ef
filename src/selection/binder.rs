//! Turns captured selections into chat input
//!
//! For each [`SelectionEvent`] the binder brings the window up, runs OCR
//! when asked to, resolves the prompt template, starts a new chat and
//! either stages `template + text` or sends it right away. The chat input
//! is focused after every event, however it ended.

use super::events::{SelectionEvent, Subscription};
use super::ocr::{collapse_cjk_whitespace, language_spec, stored_languages, OcrEngine};
use super::window::WindowPort;
use crate::chat::prompts::format_message;
use crate::chat::{ChatSession, DispatchMode, DispatchOutcome};
use crate::notice::Notice;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Notice shown when recognition takes too long
pub const OCR_TIMEOUT_NOTICE: &str = "OCR failed: Please check your network";

/// What handling a selection event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Window brought up and focused, no text handled
    FocusedOnly,
    /// No text to work with
    Empty,
    /// Formatted input staged for a manual send
    Staged(String),
    /// Formatted input sent at once
    Dispatched(DispatchOutcome),
    /// Recognition failed or timed out
    Failed(String),
}

pub struct SelectionBinder {
    session: Arc<ChatSession>,
    ocr: Arc<dyn OcrEngine>,
    window: Arc<dyn WindowPort>,
    ocr_loading: AtomicBool,
}

impl SelectionBinder {
    pub fn new(
        session: Arc<ChatSession>,
        ocr: Arc<dyn OcrEngine>,
        window: Arc<dyn WindowPort>,
    ) -> Self {
        Self {
            session,
            ocr,
            window,
            ocr_loading: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<ChatSession> {
        &self.session
    }

    /// Whether recognition is running
    pub fn is_ocr_loading(&self) -> bool {
        self.ocr_loading.load(Ordering::SeqCst)
    }

    /// Handle events from `subscription` until it is replaced or the bus goes away
    pub async fn run(&self, mut subscription: Subscription) {
        tracing::info!("Listening for {}", subscription.name());
        while let Some(event) = subscription.recv().await {
            let outcome = self.on_selection(event).await;
            tracing::debug!("Selection handled: {:?}", outcome);
        }
        tracing::info!("Stopped listening for {}", subscription.name());
    }

    /// Handle one selection event
    pub async fn on_selection(&self, event: SelectionEvent) -> SelectionOutcome {
        let outcome = self.process(event).await;

        let delay = self.session.context().config.selection.focus_delay_ms;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.window.focus_input();

        outcome
    }

    async fn process(&self, event: SelectionEvent) -> SelectionOutcome {
        self.window.show_and_center();

        if event.is_open_window_only() {
            return SelectionOutcome::FocusedOnly;
        }

        let text = if event.is_ocr {
            match self.recognize(&event.text).await {
                Ok(text) => text,
                Err(message) => return SelectionOutcome::Failed(message),
            }
        } else {
            event.text
        };

        if text.is_empty() {
            return SelectionOutcome::Empty;
        }

        let template = if event.is_open_window || event.is_ocr {
            self.session.selected_prompt()
        } else {
            event.prompt
        };

        self.session.new_chat();
        self.session.set_selected_prompt(template.as_str());
        let formatted = format_message(&template, &text);

        if event.auto_asking {
            self.session.set_staged_input("");
            let outcome = self
                .session
                .handle_chat(&formatted, DispatchMode::NewChat)
                .await;
            SelectionOutcome::Dispatched(outcome)
        } else {
            self.session.set_staged_input(formatted.as_str());
            SelectionOutcome::Staged(formatted)
        }
    }

    /// Run OCR on `image` under the configured timeout
    ///
    /// On timeout the recognition is abandoned, one error notice is shown
    /// and loading ends.
    async fn recognize(&self, image: &str) -> Result<String, String> {
        let ctx = self.session.context();
        let languages = language_spec(&stored_languages(ctx.store.as_ref()));
        let limit = Duration::from_millis(ctx.config.selection.ocr_timeout_ms);

        self.ocr_loading.store(true, Ordering::SeqCst);
        let result = tokio::time::timeout(limit, self.ocr.recognize(image, &languages)).await;
        self.ocr_loading.store(false, Ordering::SeqCst);

        match result {
            Ok(Ok(recognized)) => Ok(collapse_cjk_whitespace(recognized.text.trim())),
            Ok(Err(e)) => {
                tracing::warn!("OCR failed: {:#}", e);
                let message = e.to_string();
                ctx.notify(Notice::error(message.clone()));
                Err(message)
            }
            Err(_) => {
                tracing::warn!("OCR timed out after {:?}", limit);
                ctx.notify(Notice::error(OCR_TIMEOUT_NOTICE));
                Err(OCR_TIMEOUT_NOTICE.to_string())
            }
        }
    }
}
