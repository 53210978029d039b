//! Chat-to-bus bridge
//!
//! After a message is committed to a chat log, [`BusBridge`] publishes a
//! `chat-message` event plus one `chat-mention` (or `chat-interrupt` for
//! `@handle!`) per addressee to the project's event queue. Chat-derived
//! events are never deduplicated, whatever the queue's config says, so a
//! burst of messages is never collapsed into one signal.

pub mod mention;

pub use mention::{MAX_MENTIONS, Mention, extract_mentions};

use crate::bus::{Event, EventQueue, Priority, PublishOptions};
use crate::chat::{Message, Notifier};
use crate::text::truncate_bytes;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Event source for everything the bridge publishes about chat traffic.
pub const CHAT_SOURCE: &str = "nbs-chat";

/// Event source for human input signals.
pub const HUMAN_SOURCE: &str = "nbs-chat-terminal";

/// Payloads longer than this are cut; the full text stays in the log.
pub const MAX_PAYLOAD_BYTES: usize = 2048;

/// How many directories discovery climbs from the log's directory.
pub const MAX_DISCOVERY_DEPTH: usize = 10;

/// Locate the event queue serving the chat log at `log`.
///
/// Starting from the log's directory and climbing at most
/// [`MAX_DISCOVERY_DEPTH`] levels, each directory `d` is checked for
/// `d/../events` (the `.nbs/chat` + `.nbs/events` layout) and then
/// `d/.nbs/events`. The first existing directory wins.
pub fn find_queue_dir(log: &Path) -> Option<PathBuf> {
    let start = match log.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let start = std::fs::canonicalize(start).ok()?;

    for dir in start.ancestors().take(MAX_DISCOVERY_DEPTH) {
        for candidate in [dir.join("..").join("events"), dir.join(".nbs").join("events")] {
            match std::fs::canonicalize(&candidate) {
                Ok(resolved) if resolved.is_dir() => return Some(resolved),
                _ => {}
            }
        }
    }
    None
}

fn payload(text: String) -> Option<Vec<u8>> {
    Some(truncate_bytes(&text, MAX_PAYLOAD_BYTES).as_bytes().to_vec())
}

/// Publishes chat activity to an event queue.
#[derive(Debug, Clone)]
pub struct BusBridge {
    queue: EventQueue,
}

impl BusBridge {
    pub fn new(queue: EventQueue) -> Self {
        Self { queue }
    }

    /// Bridge for the queue found by [`find_queue_dir`], if any.
    pub fn discover(log: &Path) -> Option<Self> {
        let dir = find_queue_dir(log)?;
        tracing::debug!(log = %log.display(), queue = %dir.display(), "chat bridge enabled");
        EventQueue::open(dir).ok().map(Self::new)
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    fn publish(
        &self,
        source: &str,
        kind: &str,
        priority: Priority,
        body: Option<Vec<u8>>,
    ) -> anyhow::Result<String> {
        let event = Event::new(source, kind, priority, body)?;
        let name = self
            .queue
            .publish(&event, &PublishOptions::default())
            .with_context(|| format!("publishing {kind} to {}", self.queue.dir().display()))?;
        Ok(name)
    }

    /// Signal that a human typed `body` into the chat as `handle`.
    pub fn human_input(&self, handle: &str, body: &[u8]) -> anyhow::Result<String> {
        let text = format!("{handle}: {}", String::from_utf8_lossy(body));
        self.publish(HUMAN_SOURCE, "human-input", Priority::High, payload(text))
    }
}

impl Notifier for BusBridge {
    fn message_sent(&self, _log: &Path, message: &Message) -> anyhow::Result<()> {
        let body = message.body_lossy();
        let mut first_error = None;

        let text = format!("{}: {body}", message.handle);
        if let Err(e) = self.publish(CHAT_SOURCE, "chat-message", Priority::Normal, payload(text)) {
            first_error.get_or_insert(e);
        }

        for mention in extract_mentions(&message.body) {
            let (kind, priority) = if mention.interrupt {
                ("chat-interrupt", Priority::Critical)
            } else {
                ("chat-mention", Priority::High)
            };
            let text = format!("@{} from {}: {body}", mention.handle, message.handle);
            if let Err(e) = self.publish(CHAT_SOURCE, kind, priority, payload(text)) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
