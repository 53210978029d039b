//! Event records, priorities and event file names

use crate::error::NbsError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Extension every pending or processed event file carries.
pub const EVENT_SUFFIX: &str = ".event";

/// Event urgency. Declaration order is delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Normal,
        Priority::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// Position in [`Priority::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = NbsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(NbsError::InvalidArgument(format!(
                "invalid priority '{other}' (use: critical, high, normal, low)"
            ))),
        }
    }
}

/// One event as written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub source: String,
    pub kind: String,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
    /// Opaque payload bytes; never empty when present.
    pub payload: Option<Vec<u8>>,
}

impl Event {
    /// Build an event stamped with the current time.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `source` or `kind` is empty or contains
    /// whitespace or `/`.
    pub fn new(
        source: &str,
        kind: &str,
        priority: Priority,
        payload: Option<Vec<u8>>,
    ) -> Result<Self, NbsError> {
        validate_token("source", source)?;
        validate_token("type", kind)?;
        Ok(Self {
            source: source.to_string(),
            kind: kind.to_string(),
            priority,
            timestamp: Utc::now(),
            payload: payload.filter(|p| !p.is_empty()),
        })
    }

    /// `source:type`, the identity used for deduplication.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.source, self.kind)
    }

    /// Unique file name: `<unix-us>-<source>-<type>-<pid>-<rand>.event`.
    pub fn file_name(&self) -> String {
        let rand = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}-{}-{}{EVENT_SUFFIX}",
            self.timestamp.timestamp_micros(),
            self.source,
            self.kind,
            std::process::id(),
            &rand[..8]
        )
    }

    /// File content. The payload block runs to end of file: every payload
    /// line gets a two-space indent and a `\n`, and nothing else is touched,
    /// so `\r`, trailing newlines and non-UTF-8 bytes survive.
    pub fn render(&self) -> Vec<u8> {
        let mut out = format!(
            "source: {}\ntype: {}\npriority: {}\ntimestamp: {}\ndedup-key: {}\n",
            self.source,
            self.kind,
            self.priority,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.dedup_key()
        )
        .into_bytes();
        if let Some(payload) = &self.payload {
            out.extend_from_slice(b"payload: |\n");
            for line in payload.split(|&b| b == b'\n') {
                out.extend_from_slice(b"  ");
                out.extend_from_slice(line);
                out.push(b'\n');
            }
        }
        out
    }
}

/// Header fields of an event file as read back from disk.
///
/// Missing fields stay empty and an unknown priority reads as normal, so a
/// damaged file still sorts somewhere sensible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
    pub source: String,
    pub kind: String,
    pub priority: Priority,
    pub dedup_key: String,
    pub payload: Option<Vec<u8>>,
}

impl EventFields {
    pub fn parse(content: &[u8]) -> Self {
        let mut fields = EventFields {
            source: String::new(),
            kind: String::new(),
            priority: Priority::Normal,
            dedup_key: String::new(),
            payload: None,
        };

        let mut lines = content.split(|&b| b == b'\n');
        while let Some(raw) = lines.next() {
            let line = String::from_utf8_lossy(raw);
            let line = line.trim_end_matches('\r');
            let Some((key, value)) = line.split_once(": ") else {
                continue;
            };
            match key {
                "source" => fields.source = value.to_string(),
                "type" => fields.kind = value.to_string(),
                "priority" => fields.priority = value.parse().unwrap_or(Priority::Normal),
                "dedup-key" => fields.dedup_key = value.to_string(),
                "payload" if value == "|" => {
                    let mut body: Vec<&[u8]> = lines
                        .by_ref()
                        .map(|l| l.strip_prefix(b"  ").unwrap_or(l))
                        .collect();
                    // the final `\n` of the file, not part of the payload
                    if body.last().is_some_and(|l| l.is_empty()) {
                        body.pop();
                    }
                    fields.payload = Some(body.join(&b'\n'));
                    break;
                }
                _ => {}
            }
        }
        fields
    }
}

fn validate_token(what: &str, value: &str) -> Result<(), NbsError> {
    if value.is_empty() {
        return Err(NbsError::InvalidArgument(format!("{what} must not be empty")));
    }
    if value.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(NbsError::InvalidArgument(format!(
            "{what} must not contain whitespace or '/': {value:?}"
        )));
    }
    Ok(())
}

/// Reject names that could escape the queue directory.
pub fn validate_file_name(name: &str) -> Result<(), NbsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(NbsError::InvalidArgument(format!(
            "invalid event filename (path traversal): {name:?}"
        )));
    }
    Ok(())
}

/// Creation time in Unix microseconds, taken from the file name prefix.
///
/// `None` for anything that is not an event file name.
pub fn file_name_timestamp(name: &str) -> Option<i64> {
    let stem = name.strip_suffix(EVENT_SUFFIX)?;
    let (digits, _) = stem.split_once('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Human-readable age: `45s ago`, `3m ago`, `2h ago`, `5d ago`.
pub fn format_age(age_us: i64) -> String {
    let secs = (age_us / 1_000_000).max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
