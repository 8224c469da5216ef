//! Window control port
//!
//! Showing, centering and focusing the app window is platform work done
//! outside this crate. The binder drives it through [`WindowPort`].

#[cfg_attr(test, mockall::automock)]
pub trait WindowPort: Send + Sync {
    /// Bring the window to the foreground and center it
    fn show_and_center(&self);

    /// Move keyboard focus to the chat input
    fn focus_input(&self);
}

/// Window port for terminal use; only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessWindow;

impl WindowPort for HeadlessWindow {
    fn show_and_center(&self) {
        tracing::trace!("show_and_center");
    }

    fn focus_input(&self) {
        tracing::trace!("focus_input");
    }
}
