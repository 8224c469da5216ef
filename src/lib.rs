//! PopAsk - selection-to-chat assistant library
//!
//! This library provides the client-side core of PopAsk: turning captured
//! selections into prompts, running chat requests one at a time against a
//! daily allowance, and keeping conversation history.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `chat`: Messages, conversations, archive, daily quota, prompts and the request lifecycle
//! - `selection`: Selection events, OCR and the selection binder
//! - `providers`: Chat endpoint abstraction and the HTTP implementation
//! - `storage`: Key-value persistence (SQLite and in-memory)
//! - `context`: The shared application context
//! - `notice`: User-facing notices
//! - `clock`: Time source
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use popask::chat::{ChatSession, DispatchMode};
//! use popask::context::AppContext;
//! use popask::providers::create_provider;
//! use popask::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let ctx = AppContext::in_memory(config);
//!     let provider = create_provider(&ctx.config.endpoint)?;
//!     let session = ChatSession::new(ctx, provider);
//!     session.handle_chat("Hello!", DispatchMode::Continue).await;
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod notice;
pub mod providers;
pub mod selection;
pub mod storage;

// Re-export commonly used types
pub use chat::{ChatSession, DispatchMode, DispatchOutcome, UsageLimiter};
pub use config::Config;
pub use context::AppContext;
pub use error::{PopAskError, Result};
pub use selection::{SelectionBinder, SelectionEvent};

#[cfg(test)]
pub mod test_utils;
