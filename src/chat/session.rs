//! Chat request lifecycle
//!
//! [`ChatSession`] owns the in-progress conversation and runs one request
//! at a time through validation, dispatch, classification of the reply
//! and the resulting history mutation.
//!
//! State lives behind a single mutex that is never held across an
//! `.await`: the lock is taken to validate and mutate, dropped while the
//! provider call is pending, and taken again to apply the result. Every
//! dispatch gets a request id; the continuation only applies its result
//! when the pending request still carries that id and was not stopped.

use super::conversation::{build_chat_messages, Conversation, DispatchMode};
use super::history::{ArchiveOutcome, ChatArchive};
use super::message::{Message, MessageFactory, Role};
use super::prompts::PromptLibrary;
use crate::context::AppContext;
use crate::notice::Notice;
use crate::providers::{normalize_payload, ChatProvider, ChatTurn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Why a dispatch was refused before anything was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another request is still pending
    InFlight,
    /// The message is empty or whitespace
    EmptyMessage,
    /// Today's allowance is used up
    QuotaExhausted { limit: u32 },
    /// The edit or regenerate target does not exist
    InvalidIndex,
}

/// How a dispatch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The assistant reply that was appended
    Completed(Message),
    /// The endpoint or transport failed with this text
    Failed(String),
    /// The request was stopped or superseded before its reply arrived
    Cancelled,
    /// Refused during validation; nothing was mutated
    Rejected(Rejection),
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DispatchOutcome::Completed(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    id: u64,
    cancelled: bool,
}

/// A dispatch that passed validation and is ready to send
struct Ticket {
    id: u64,
    transcript: Vec<ChatTurn>,
}

/// Clears the pending request when its dispatch is dropped before the reply
struct PendingGuard<'a> {
    session: &'a ChatSession,
    id: u64,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.session.lock();
        if matches!(state.pending, Some(p) if p.id == self.id) {
            state.pending = None;
            tracing::debug!("Request {} dropped before its reply", self.id);
        }
    }
}

#[derive(Debug)]
struct SessionState {
    conversation: Conversation,
    archive: ChatArchive,
    prompts: PromptLibrary,
    staged_input: String,
    factory: MessageFactory,
    pending: Option<PendingRequest>,
    next_request_id: u64,
}

impl SessionState {
    fn is_loading(&self) -> bool {
        self.pending.map_or(false, |p| !p.cancelled)
    }

    /// Whether the continuation of request `id` may still touch state
    fn owns(&self, id: u64) -> bool {
        matches!(self.pending, Some(p) if p.id == id && !p.cancelled)
    }
}

/// The chat conversation and its single-flight request lifecycle
///
/// # Examples
///
/// ```no_run
/// use popask::chat::{ChatSession, DispatchMode};
/// use popask::config::Config;
/// use popask::context::AppContext;
/// use popask::providers::create_provider;
///
/// # async fn example() -> popask::error::Result<()> {
/// let ctx = AppContext::in_memory(Config::default());
/// let provider = create_provider(&ctx.config.endpoint)?;
/// let session = ChatSession::new(ctx, provider);
/// let outcome = session.handle_chat("Hello!", DispatchMode::Continue).await;
/// println!("{:?}", outcome);
/// # Ok(())
/// # }
/// ```
pub struct ChatSession {
    ctx: AppContext,
    provider: Arc<dyn ChatProvider>,
    state: Mutex<SessionState>,
}

impl ChatSession {
    /// Create a session, loading the archive and prompts from the store
    pub fn new(ctx: AppContext, provider: Arc<dyn ChatProvider>) -> Self {
        let archive = ChatArchive::load(ctx.store.as_ref());
        let prompts = PromptLibrary::load(ctx.store.as_ref(), ctx.config.prompts.recent_limit);

        Self {
            provider,
            state: Mutex::new(SessionState {
                conversation: Conversation::new(),
                archive,
                prompts,
                staged_input: String::new(),
                factory: MessageFactory::new(),
                pending: None,
                next_request_id: 1,
            }),
            ctx,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send `content` according to `mode`
    ///
    /// Validation rejects, in order: a request already in flight, empty
    /// content, an exhausted daily allowance, and an edit or regenerate
    /// index that addresses no message. A rejected call leaves the
    /// conversation untouched.
    ///
    /// The outgoing user message is added to the conversation before the
    /// endpoint answers and stays there if the request fails.
    pub async fn handle_chat(&self, content: &str, mode: DispatchMode) -> DispatchOutcome {
        let ticket = {
            let mut state = self.lock();
            self.begin(&mut state, content, mode)
        };
        self.run(ticket).await
    }

    /// Send the staged input as the next turn
    ///
    /// The staged input is cleared once the request passes validation.
    pub async fn send_staged(&self) -> DispatchOutcome {
        let ticket = {
            let mut state = self.lock();
            let content = state.staged_input.clone();
            let ticket = self.begin(&mut state, &content, DispatchMode::Continue);
            if ticket.is_ok() {
                state.staged_input.clear();
            }
            ticket
        };
        self.run(ticket).await
    }

    /// Replace the user message `id` with `content` and re-send from there
    pub async fn edit_message(&self, id: i64, content: &str) -> DispatchOutcome {
        let ticket = {
            let mut state = self.lock();
            match state.conversation.index_of(id) {
                Some(index) if state.conversation.messages()[index].is_user() => {
                    self.begin(&mut state, content.trim(), DispatchMode::Edit { index })
                }
                _ => Err(Rejection::InvalidIndex),
            }
        };
        self.run(ticket).await
    }

    /// Ask again for the reply with message id `id`
    ///
    /// The reply and everything after it is dropped and the user message
    /// right before it is re-sent. Does nothing when the message is first
    /// in the conversation, does not follow a user message, or a request is
    /// still pending.
    pub async fn regenerate(&self, id: i64) -> DispatchOutcome {
        let ticket = {
            let mut state = self.lock();
            if state.is_loading() {
                tracing::debug!("Ignoring regenerate of {} while a request is pending", id);
                return DispatchOutcome::Rejected(Rejection::InFlight);
            }
            match regenerate_target(&state.conversation, id) {
                Some((index, content)) => {
                    self.begin(&mut state, &content, DispatchMode::Regenerate { index })
                }
                None => Err(Rejection::InvalidIndex),
            }
        };
        self.run(ticket).await
    }

    /// Stop the pending request
    ///
    /// Loading ends at once. The network call is not aborted; its reply is
    /// discarded when it arrives. Returns `false` when nothing was pending.
    pub fn stop_request(&self) -> bool {
        let stopped = {
            let mut state = self.lock();
            match state.pending.as_mut() {
                Some(pending) if !pending.cancelled => {
                    pending.cancelled = true;
                    tracing::info!("Stopped request {}", pending.id);
                    true
                }
                _ => false,
            }
        };
        if stopped {
            self.ctx.notify(Notice::info("Request stopped"));
        }
        stopped
    }

    /// Validate under the lock and apply the optimistic mutation
    fn begin(
        &self,
        state: &mut SessionState,
        content: &str,
        mode: DispatchMode,
    ) -> Result<Ticket, Rejection> {
        if state.is_loading() {
            return Err(Rejection::InFlight);
        }
        if content.trim().is_empty() {
            return Err(Rejection::EmptyMessage);
        }

        let limit = self.ctx.config.usage.daily_limit;
        if !self.ctx.usage_limiter().check_limit(limit).can_use {
            return Err(Rejection::QuotaExhausted { limit });
        }

        let incoming = state.factory.user(content, self.ctx.clock.now());
        let next = build_chat_messages(&state.conversation, incoming, mode)
            .ok_or(Rejection::InvalidIndex)?;

        let transcript = next.messages().iter().map(ChatTurn::from).collect();
        state.conversation = next;

        let id = state.next_request_id;
        state.next_request_id += 1;
        state.pending = Some(PendingRequest {
            id,
            cancelled: false,
        });

        tracing::debug!("Dispatching request {} ({:?})", id, mode);
        Ok(Ticket { id, transcript })
    }

    async fn run(&self, ticket: Result<Ticket, Rejection>) -> DispatchOutcome {
        match ticket {
            Ok(ticket) => self.dispatch(ticket).await,
            Err(rejection) => {
                self.report_rejection(rejection);
                DispatchOutcome::Rejected(rejection)
            }
        }
    }

    fn report_rejection(&self, rejection: Rejection) {
        tracing::debug!("Dispatch rejected: {:?}", rejection);
        match rejection {
            Rejection::InFlight => self.ctx.notify(Notice::warning(
                "Please wait for the current request to complete",
            )),
            Rejection::EmptyMessage => self.ctx.notify(Notice::warning("Please enter a message")),
            Rejection::QuotaExhausted { limit } => self.ctx.notify(Notice::warning(format!(
                "Daily usage limit reached ({} times), please try again tomorrow",
                limit
            ))),
            Rejection::InvalidIndex => {}
        }
    }

    async fn dispatch(&self, ticket: Ticket) -> DispatchOutcome {
        let api_key = self.ctx.api_key();
        let mut guard = PendingGuard {
            session: self,
            id: ticket.id,
            armed: true,
        };
        let result = self
            .provider
            .send(&ticket.transcript, api_key.as_deref())
            .await;
        guard.armed = false;
        drop(guard);

        let mut state = self.lock();
        if !state.owns(ticket.id) {
            if matches!(state.pending, Some(p) if p.id == ticket.id) {
                state.pending = None;
            }
            tracing::debug!("Discarding reply for stopped request {}", ticket.id);
            return DispatchOutcome::Cancelled;
        }
        state.pending = None;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                drop(state);
                tracing::warn!("Request {} failed: {:#}", ticket.id, e);
                let text = match e.to_string() {
                    s if s.is_empty() => "Failed to get response".to_string(),
                    s => s,
                };
                self.ctx.notify(Notice::error(text.clone()));
                return DispatchOutcome::Failed(text);
            }
        };

        if !response.is_success() {
            drop(state);
            let text = response.error_text();
            tracing::warn!("Request {} answered with code {}", ticket.id, response.code);
            self.ctx.notify(Notice::error(text.clone()));
            return DispatchOutcome::Failed(text);
        }

        let reply = state
            .factory
            .assistant(normalize_payload(&response.data), self.ctx.clock.now());
        state.conversation = std::mem::take(&mut state.conversation).append(reply.clone());
        if state.prompts.record_recent().is_some() {
            state.prompts.save(self.ctx.store.as_ref());
        }
        drop(state);

        self.record_usage();
        DispatchOutcome::Completed(reply)
    }

    fn record_usage(&self) {
        let usage = &self.ctx.config.usage;
        let used = self.ctx.usage_limiter().increment();
        let remaining = usage.daily_limit.saturating_sub(used);
        if remaining <= usage.low_quota_threshold {
            self.ctx.notify(Notice::info(format!(
                "Remaining daily usage: {} times",
                remaining
            )));
        }
    }

    /// Archive the conversation and start an empty one
    ///
    /// Does nothing while a request is loading and returns `None`.
    pub fn new_chat(&self) -> Option<ArchiveOutcome> {
        let mut state = self.lock();
        if state.is_loading() {
            return None;
        }
        let conversation = std::mem::take(&mut state.conversation);
        let outcome = state.archive.archive(conversation);
        if outcome == ArchiveOutcome::Archived {
            state.archive.save(self.ctx.store.as_ref());
        }
        Some(outcome)
    }

    /// Archive the conversation and keep it open
    pub fn save_chat(&self) -> ArchiveOutcome {
        let mut state = self.lock();
        let conversation = state.conversation.clone();
        let outcome = state.archive.archive(conversation);
        match outcome {
            ArchiveOutcome::Archived => {
                state.archive.save(self.ctx.store.as_ref());
                drop(state);
                self.ctx.notify(Notice::success("Chat saved"));
            }
            ArchiveOutcome::Duplicate => {
                drop(state);
                self.ctx.notify(Notice::info("Chat already saved"));
            }
            ArchiveOutcome::Empty => {}
        }
        outcome
    }

    /// Drop the conversation without archiving it
    pub fn clear_chat(&self) -> bool {
        {
            let mut state = self.lock();
            if state.is_loading() {
                return false;
            }
            state.conversation = Conversation::new();
        }
        self.ctx.notify(Notice::success("Chat cleared"));
        true
    }

    /// Put back an archived session as the current conversation
    pub fn restore(&self, index: usize) -> bool {
        let mut state = self.lock();
        if state.is_loading() {
            return false;
        }
        match state.archive.sessions().get(index) {
            Some(session) => {
                state.conversation = session.clone();
                true
            }
            None => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading()
    }

    /// Snapshot of the current conversation
    pub fn conversation(&self) -> Conversation {
        self.lock().conversation.clone()
    }

    /// Snapshot of the archive
    pub fn archive(&self) -> ChatArchive {
        self.lock().archive.clone()
    }

    /// Snapshot of the prompt library
    pub fn prompts(&self) -> PromptLibrary {
        self.lock().prompts.clone()
    }

    pub fn staged_input(&self) -> String {
        self.lock().staged_input.clone()
    }

    pub fn set_staged_input(&self, input: impl Into<String>) {
        self.lock().staged_input = input.into();
    }

    pub fn take_staged_input(&self) -> String {
        std::mem::take(&mut self.lock().staged_input)
    }

    pub fn selected_prompt(&self) -> String {
        self.lock().prompts.selected().to_string()
    }

    /// Select a prompt template without touching the staged input
    pub fn set_selected_prompt(&self, template: impl Into<String>) {
        let mut state = self.lock();
        state.prompts.select(template);
        state.prompts.save(self.ctx.store.as_ref());
    }

    /// Select the prompt named `label` and re-template the staged input
    pub fn select_prompt(&self, label: &str) -> Option<String> {
        let mut state = self.lock();
        let template = state.prompts.select_by_label(label)?;
        if !state.staged_input.is_empty() {
            state.staged_input = state.prompts.retemplate(&state.staged_input, &template);
        }
        state.prompts.save(self.ctx.store.as_ref());
        Some(template)
    }
}

/// Index of the reply `id` and the user content it answered
fn regenerate_target(conversation: &Conversation, id: i64) -> Option<(usize, String)> {
    let index = conversation.index_of(id)?;
    let previous = conversation.get(index.checked_sub(1)?)?;
    (previous.role == Role::User).then(|| (index, previous.content.clone()))
}
