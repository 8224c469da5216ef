//! User-facing notices
//!
//! The chat core never prints. Everything the user should see (warnings
//! about rejected sends, errors from the endpoint, quota reminders) is
//! handed to a [`NoticeSink`].

use colored::Colorize;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warn",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// Receiver of user-facing notices
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Sends notices to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotices;

impl NoticeSink for TracingNotices {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
    }
}

/// Prints notices to stderr with color
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotices;

impl NoticeSink for ConsoleNotices {
    fn notify(&self, notice: Notice) {
        let line = match notice.level {
            NoticeLevel::Info => notice.message.cyan(),
            NoticeLevel::Success => notice.message.green(),
            NoticeLevel::Warning => notice.message.yellow(),
            NoticeLevel::Error => notice.message.red(),
        };
        eprintln!("{}", line);
    }
}

/// Collects notices in memory
///
/// Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct NoticeLog {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far
    pub fn notices(&self) -> Vec<Notice> {
        self.lock().clone()
    }

    /// Notices of a single level
    pub fn of_level(&self, level: NoticeLevel) -> Vec<Notice> {
        self.lock()
            .iter()
            .filter(|n| n.level == level)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notice>> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NoticeSink for NoticeLog {
    fn notify(&self, notice: Notice) {
        self.lock().push(notice);
    }
}
