//! Chat core for PopAsk
//!
//! - `message`: messages and id allocation
//! - `conversation`: the in-progress conversation and its mutations
//! - `history`: archived conversations and quick-ask records
//! - `quota`: the daily usage counter
//! - `prompts`: prompt templates and recently used prompts
//! - `session`: the single-flight request lifecycle
//! - `ask`: single-shot questions

pub mod ask;
pub mod conversation;
pub mod history;
pub mod message;
pub mod prompts;
pub mod quota;
pub mod session;

pub use ask::{AskOutcome, QuickAsk};
pub use conversation::{build_chat_messages, Conversation, DispatchMode};
pub use history::{ArchiveOutcome, AskHistory, AskRecord, ChatArchive};
pub use message::{Message, MessageFactory, Role};
pub use prompts::{format_message, Prompt, PromptLibrary};
pub use quota::{UsageInfo, UsageLimiter};
pub use session::{ChatSession, DispatchOutcome, Rejection};
