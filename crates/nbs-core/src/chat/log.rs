//! Chat log operations: create, send, read, search, participants, poll

use super::cursor::CursorStore;
use super::format::{self, ChatState, Message, Participant, validate_handle};
use super::{NoopNotifier, Notifier};
use crate::error::NbsError;
use crate::io::{DEFAULT_LOCK_WAIT, Rewrite, create_new, rewrite};
use chrono::{DateTime, Local};
use regex::RegexBuilder;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default interval between re-reads while polling.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Tuning knobs for chat log operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatOptions {
    /// How long a writer waits for the log or cursor lock.
    pub lock_wait: Duration,
    /// Sleep between re-reads in [`ChatLog::poll`].
    pub poll_interval: Duration,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            lock_wait: DEFAULT_LOCK_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Positional filters for [`ChatLog::read_filtered`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadFilter {
    /// Keep only the most recent N messages.
    pub last: Option<usize>,
    /// Keep only messages after this handle's most recent message. A handle
    /// that never posted selects everything.
    pub since: Option<String>,
}

impl ReadFilter {
    pub fn apply(&self, mut messages: Vec<Message>) -> Vec<Message> {
        if let Some(since) = &self.since {
            if let Some(pos) = messages.iter().rposition(|m| &m.handle == since) {
                messages.drain(..=pos);
            }
        }
        if let Some(last) = self.last {
            let excess = messages.len().saturating_sub(last);
            messages.drain(..excess);
        }
        messages
    }
}

/// Result of [`ChatLog::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// New messages from other handles, in log order.
    Messages(Vec<Message>),
    /// The timeout elapsed with nothing new from anyone else.
    TimedOut,
}

/// Handle to one chat log file.
#[derive(Clone)]
pub struct ChatLog {
    path: PathBuf,
    options: ChatOptions,
    notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for ChatLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatLog")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: ChatOptions::default(),
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Install the notifier called after every successful send.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cursors(&self) -> CursorStore {
        CursorStore::for_log(&self.path, self.options.lock_wait)
    }

    /// Create an empty log.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if anything is already at the path, `NotFound` if the
    /// parent directory does not exist.
    pub fn create(&self) -> Result<(), NbsError> {
        let bytes = format::render(format::INITIAL_WRITER, &timestamp_now(), &[], &[]);
        create_new(&self.path, &bytes)?;
        tracing::debug!(path = %self.path.display(), "created chat log");
        Ok(())
    }

    /// Append one message and return it with its ordinal.
    ///
    /// After the log is committed, the sender's existing cursor is moved
    /// past the new message and the notifier is invoked. Neither step can
    /// fail the send.
    ///
    /// Moving the cursor also marks as read every message other handles
    /// appended between the sender's last unread read and this send. A
    /// sender who never runs `read --unread` again will not see them as
    /// unread; `read --last` or `poll` still reach them. A handle with no
    /// cursor yet is left alone.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a bad handle, `NotFound` if the log does not
    /// exist, `LockTimeout` or `Io` if the rewrite fails.
    pub fn send(&self, handle: &str, body: &[u8]) -> Result<Message, NbsError> {
        validate_handle(handle)?;

        let now = Local::now();
        let record = format::encode_record(handle, now.timestamp(), body);
        let message = rewrite(&self.path, self.options.lock_wait, |current| {
            let mut records = format::record_lines(&current);
            let mut state = format::parse(&current);
            records.push(record);

            let message = Message {
                ordinal: records.len() as u64,
                handle: handle.to_string(),
                timestamp: Some(now.timestamp()),
                body: body.to_vec(),
            };
            state.messages.push(message.clone());

            let records: Vec<&str> = records.iter().map(String::as_str).collect();
            let bytes = format::render(handle, &format_timestamp(&now), &state.tally(), &records);
            Ok(Rewrite::Replace(bytes, message))
        })?;

        tracing::debug!(
            path = %self.path.display(),
            handle,
            ordinal = message.ordinal,
            bytes = body.len(),
            "message sent"
        );

        if let Err(e) = self.cursors().advance_existing(handle, message.ordinal) {
            tracing::warn!(handle, error = %e, "could not advance sender cursor");
        }
        if let Err(e) = self.notifier.message_sent(&self.path, &message) {
            tracing::warn!(handle, error = %e, "message notification failed");
        }

        Ok(message)
    }

    /// Read and parse the whole log.
    pub fn read(&self) -> Result<ChatState, NbsError> {
        let bytes = fs::read(&self.path).map_err(|e| NbsError::io(&self.path, e))?;
        Ok(format::parse(&bytes))
    }

    /// Messages selected by `filter`, in log order.
    pub fn read_filtered(&self, filter: &ReadFilter) -> Result<Vec<Message>, NbsError> {
        Ok(filter.apply(self.read()?.messages))
    }

    /// Messages `handle` has not seen yet; advances its cursor past them.
    ///
    /// The cursor file is the only thing written. Concurrent calls for the
    /// same handle serialize on the cursor lock, so each message is handed
    /// out once.
    pub fn unread(&self, handle: &str) -> Result<Vec<Message>, NbsError> {
        validate_handle(handle)?;
        self.require_exists()?;
        self.cursors().update(handle, |previous| {
            let state = self.read()?;
            let unread = after(state.messages, previous);
            Ok((state.last_ordinal.max(previous), unread))
        })
    }

    /// Same selection as [`ChatLog::unread`] but never writes anything.
    pub fn peek(&self, handle: &str) -> Result<Vec<Message>, NbsError> {
        validate_handle(handle)?;
        let state = self.read()?;
        let position = self.cursors().position(handle)?;
        Ok(after(state.messages, position))
    }

    /// Case-insensitive search over message bodies.
    ///
    /// `pattern` is a regular expression; if it does not compile it is
    /// matched as a literal string instead.
    pub fn search(&self, pattern: &str) -> Result<Vec<Message>, NbsError> {
        if pattern.is_empty() {
            return Err(NbsError::InvalidArgument(
                "search pattern must not be empty".into(),
            ));
        }
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .or_else(|_| {
                RegexBuilder::new(&regex::escape(pattern))
                    .case_insensitive(true)
                    .build()
            })
            .map_err(|e| NbsError::InvalidArgument(format!("bad pattern: {e}")))?;

        Ok(self
            .read()?
            .messages
            .into_iter()
            .filter(|m| regex.is_match(&m.body_lossy()))
            .collect())
    }

    /// Distinct senders with their message counts, in order of first post.
    pub fn participants(&self) -> Result<Vec<Participant>, NbsError> {
        Ok(self.read()?.tally())
    }

    /// Wait until someone other than `handle` posts, or `timeout` elapses.
    ///
    /// Only messages appended after the call starts count. The log is
    /// re-read every `poll_interval`; no lock is taken.
    pub fn poll(&self, handle: &str, timeout: Duration) -> Result<PollOutcome, NbsError> {
        validate_handle(handle)?;
        let baseline = self.read()?.last_ordinal;
        let deadline = Instant::now() + timeout;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(PollOutcome::TimedOut);
            }
            std::thread::sleep(self.options.poll_interval.min(deadline - now));

            let fresh: Vec<Message> = after(self.read()?.messages, baseline)
                .into_iter()
                .filter(|m| m.handle != handle)
                .collect();
            if !fresh.is_empty() {
                return Ok(PollOutcome::Messages(fresh));
            }
        }
    }

    fn require_exists(&self) -> Result<(), NbsError> {
        fs::metadata(&self.path)
            .map(|_| ())
            .map_err(|e| NbsError::io(&self.path, e))
    }
}

fn after(messages: Vec<Message>, ordinal: u64) -> Vec<Message> {
    messages.into_iter().filter(|m| m.ordinal > ordinal).collect()
}

fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%z").to_string()
}

fn timestamp_now() -> String {
    format_timestamp(&Local::now())
}

/// Render a message for terminal output: `[YYYY-MM-DD HH:MM:SS] handle: body`.
///
/// Legacy records without a timestamp render as `handle: body`. The body
/// bytes are copied through untouched.
pub fn display_line(message: &Message) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.body.len() + message.handle.len() + 24);
    if let Some(local) = message
        .timestamp
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|utc| utc.with_timezone(&Local))
    {
        out.extend_from_slice(local.format("[%Y-%m-%d %H:%M:%S] ").to_string().as_bytes());
    }
    out.extend_from_slice(message.handle.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(&message.body);
    out
}
