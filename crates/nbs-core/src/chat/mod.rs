//! Shared chat log with per-reader cursors
//!
//! A chat log is a single file that any number of processes append to
//! concurrently. Writers serialize on `<log>.lock` and replace the whole file
//! through [`crate::io::rewrite`]; readers never lock.

pub mod cursor;
pub mod format;
pub mod log;

pub use cursor::{CursorStore, Cursors, cursor_path_for};
pub use format::{ChatState, Header, MAX_HANDLE_LEN, Message, Participant, validate_handle};
pub use log::{ChatLog, ChatOptions, PollOutcome, ReadFilter, display_line};

use std::path::Path;

/// Receives every message right after it has been committed to a log.
///
/// Implementations are best-effort side channels: an error returned here is
/// logged and dropped, and never fails the send that triggered it.
pub trait Notifier: Send + Sync {
    fn message_sent(&self, log: &Path, message: &Message) -> anyhow::Result<()>;
}

/// Notifier that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn message_sent(&self, _log: &Path, _message: &Message) -> anyhow::Result<()> {
        Ok(())
    }
}
