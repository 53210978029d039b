//! On-disk layout of a chat log
//!
//! ```text
//! === nbs-chat ===
//! last-writer: alice
//! last-write: 2026-03-01T12:00:00+0000
//! file-length: 187
//! participants: alice(2), bob(1)
//! ---
//! YWxpY2V8MTc3MjM2NjQwMDogaGk=
//! ...
//! ```
//!
//! Each line after `---` is one base64-encoded record `handle|EPOCH: body`.
//! Parsing is lenient: unknown or missing header fields fall back to
//! defaults and undecodable records are skipped without affecting their
//! neighbours.

use crate::codec;
use serde::Serialize;

pub(crate) const MAGIC: &str = "=== nbs-chat ===";
pub(crate) const DELIMITER: &str = "---";
pub(crate) const INITIAL_WRITER: &str = "system";

/// Longest accepted handle in bytes.
pub const MAX_HANDLE_LEN: usize = 63;

/// One message in a chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// 1-based position among the record lines of the log.
    pub ordinal: u64,
    pub handle: String,
    /// Unix seconds at send time; `None` for legacy records.
    pub timestamp: Option<i64>,
    pub body: Vec<u8>,
}

impl Message {
    /// Body as text, with invalid UTF-8 replaced.
    pub fn body_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// A handle and how many messages it has sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub handle: String,
    pub count: u64,
}

/// Parsed header fields. Anything missing is `None` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub last_writer: Option<String>,
    pub last_write: Option<String>,
    pub file_length: Option<u64>,
    pub participants: Vec<Participant>,
}

/// Everything a reader learns from one pass over the file.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub header: Header,
    pub messages: Vec<Message>,
    /// Highest ordinal in the file, counting skipped records.
    pub last_ordinal: u64,
    /// Records that failed to decode.
    pub skipped: usize,
}

impl ChatState {
    /// Count messages per handle in order of first appearance.
    pub fn tally(&self) -> Vec<Participant> {
        tally(&self.messages)
    }
}

pub(crate) fn tally(messages: &[Message]) -> Vec<Participant> {
    let mut out: Vec<Participant> = Vec::new();
    for msg in messages {
        match out.iter_mut().find(|p| p.handle == msg.handle) {
            Some(p) => p.count += 1,
            None => out.push(Participant {
                handle: msg.handle.clone(),
                count: 1,
            }),
        }
    }
    out
}

/// Encode one record as a single log line (no terminator).
pub fn encode_record(handle: &str, timestamp: i64, body: &[u8]) -> String {
    let mut raw = Vec::with_capacity(handle.len() + 24 + body.len());
    raw.extend_from_slice(handle.as_bytes());
    raw.push(b'|');
    raw.extend_from_slice(timestamp.to_string().as_bytes());
    raw.extend_from_slice(b": ");
    raw.extend_from_slice(body);
    codec::encode(&raw)
}

/// Decode one record line. `None` when the line is corrupt.
pub fn decode_record(line: &str, ordinal: u64) -> Option<Message> {
    let raw = match codec::decode(line) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(ordinal, error = %e, "skipping corrupt chat record");
            return None;
        }
    };

    let colon = raw.iter().position(|&b| b == b':')?;
    let prefix = std::str::from_utf8(&raw[..colon]).ok()?;
    let rest = &raw[colon + 1..];
    let body = rest.strip_prefix(b" ").unwrap_or(rest);

    let (handle, timestamp) = match prefix.split_once('|') {
        Some((handle, epoch)) => (handle, epoch.parse::<i64>().ok()),
        None => (prefix, None),
    };
    if handle.is_empty() {
        tracing::warn!(ordinal, "skipping chat record with empty handle");
        return None;
    }

    Some(Message {
        ordinal,
        handle: handle.to_string(),
        timestamp,
        body: body.to_vec(),
    })
}

fn parse_participants(value: &str) -> Vec<Participant> {
    value
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            let (handle, count) = entry.strip_suffix(')')?.split_once('(')?;
            if handle.is_empty() {
                return None;
            }
            Some(Participant {
                handle: handle.to_string(),
                count: count.parse().ok()?,
            })
        })
        .collect()
}

fn format_participants(participants: &[Participant]) -> String {
    participants
        .iter()
        .map(|p| format!("{}({})", p.handle, p.count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Returns true if `line` belongs to the header block.
fn apply_header_line(header: &mut Header, line: &str) -> bool {
    if line == MAGIC {
        return true;
    }
    let Some((key, value)) = line.split_once(':') else {
        return false;
    };
    let value = value.trim();
    match key {
        "last-writer" => header.last_writer = Some(value.to_string()),
        "last-write" => header.last_write = Some(value.to_string()),
        "file-length" => header.file_length = value.parse().ok(),
        "participants" => header.participants = parse_participants(value),
        _ => return false,
    }
    true
}

/// Parse a whole chat file.
///
/// A file without the `---` delimiter (truncated, or written by something
/// else) is still read: recognised header lines are taken as header and
/// every other non-empty line as a record.
pub fn parse(content: &[u8]) -> ChatState {
    let text = String::from_utf8_lossy(content);
    let has_delimiter = text.lines().any(|l| l.trim_end_matches('\r') == DELIMITER);

    let mut state = ChatState::default();
    let mut in_header = has_delimiter;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if in_header {
            if line == DELIMITER {
                in_header = false;
            } else {
                apply_header_line(&mut state.header, line);
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if !has_delimiter && apply_header_line(&mut state.header, line) {
            continue;
        }

        state.last_ordinal += 1;
        match decode_record(line, state.last_ordinal) {
            Some(msg) => state.messages.push(msg),
            None => state.skipped += 1,
        }
    }
    state
}

/// Render a complete file from header values and record lines.
///
/// `file-length` is part of the content it measures, so the value is
/// iterated until the rendered size stops changing.
pub fn render(
    last_writer: &str,
    last_write: &str,
    participants: &[Participant],
    records: &[&str],
) -> Vec<u8> {
    let participants = format_participants(participants);
    let mut length = 0usize;
    loop {
        let mut out = String::new();
        out.push_str(MAGIC);
        out.push('\n');
        out.push_str(&format!("last-writer: {last_writer}\n"));
        out.push_str(&format!("last-write: {last_write}\n"));
        out.push_str(&format!("file-length: {length}\n"));
        out.push_str(&format!("participants: {participants}\n"));
        out.push_str(DELIMITER);
        out.push('\n');
        for record in records {
            out.push_str(record);
            out.push('\n');
        }
        if out.len() == length {
            return out.into_bytes();
        }
        length = out.len();
    }
}

/// Record lines of an existing file, in order, exactly as stored.
pub(crate) fn record_lines(content: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(content);
    let has_delimiter = text.lines().any(|l| l.trim_end_matches('\r') == DELIMITER);
    let mut scratch = Header::default();
    let mut in_header = has_delimiter;
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if in_header {
            in_header = line != DELIMITER;
            continue;
        }
        if line.is_empty() || (!has_delimiter && apply_header_line(&mut scratch, line)) {
            continue;
        }
        out.push(line.to_string());
    }
    out
}

/// Check a sender or reader handle.
pub fn validate_handle(handle: &str) -> Result<(), crate::error::NbsError> {
    use crate::error::NbsError;
    if handle.is_empty() {
        return Err(NbsError::InvalidArgument("handle must not be empty".into()));
    }
    if handle.len() > MAX_HANDLE_LEN {
        return Err(NbsError::InvalidArgument(format!(
            "handle longer than {MAX_HANDLE_LEN} bytes"
        )));
    }
    if let Some(c) = handle
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, ':' | '|' | '='))
    {
        return Err(NbsError::InvalidArgument(format!(
            "handle {handle:?} contains {c:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(records: &[&str]) -> Vec<u8> {
        render(
            "alice",
            "2026-03-01T12:00:00+0000",
            &[Participant {
                handle: "alice".into(),
                count: 1,
            }],
            records,
        )
    }

    #[test]
    fn test_file_length_matches_rendered_size() {
        for n in [0usize, 1, 7, 40, 400] {
            let line = encode_record("alice", 1_700_000_000, b"hello");
            let records: Vec<&str> = std::iter::repeat_n(line.as_str(), n).collect();
            let bytes = sample(&records);
            let state = parse(&bytes);
            assert_eq!(state.header.file_length, Some(bytes.len() as u64), "n={n}");
        }
    }

    #[test]
    fn test_fresh_file_layout() {
        let bytes = render(INITIAL_WRITER, "2026-03-01T12:00:00+0000", &[], &[]);
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("=== nbs-chat ===\nlast-writer: system\n"));
        assert!(text.contains("\nparticipants: \n---\n"));

        let state = parse(&bytes);
        assert!(state.messages.is_empty());
        assert!(state.header.participants.is_empty());
        assert_eq!(state.last_ordinal, 0);
    }

    #[test]
    fn test_record_round_trip_with_separators_in_body() {
        let body = b"a: b|c\nd\x00\xff";
        let line = encode_record("bob", 42, body);
        let msg = decode_record(&line, 3).unwrap();
        assert_eq!(msg.handle, "bob");
        assert_eq!(msg.timestamp, Some(42));
        assert_eq!(msg.body, body);
        assert_eq!(msg.ordinal, 3);
    }

    #[test]
    fn test_legacy_record_without_epoch() {
        let line = codec::encode(b"carol: old style");
        let msg = decode_record(&line, 1).unwrap();
        assert_eq!(msg.handle, "carol");
        assert_eq!(msg.timestamp, None);
        assert_eq!(msg.body, b"old style");
    }

    #[test]
    fn test_corrupt_line_keeps_its_ordinal() {
        let a = encode_record("alice", 1, b"one");
        let c = encode_record("bob", 3, b"three");
        let bytes = sample(&[&a, "%%% not base64 %%%", &c]);

        let state = parse(&bytes);
        assert_eq!(state.skipped, 1);
        assert_eq!(state.last_ordinal, 3);
        let ordinals: Vec<u64> = state.messages.iter().map(|m| m.ordinal).collect();
        assert_eq!(ordinals, vec![1, 3]);
    }

    #[test]
    fn test_missing_delimiter_still_reads_records() {
        let a = encode_record("alice", 1, b"one");
        let content = format!("=== nbs-chat ===\nlast-writer: alice\n{a}\n");
        let state = parse(content.as_bytes());
        assert_eq!(state.header.last_writer.as_deref(), Some("alice"));
        assert_eq!(state.header.file_length, None);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(record_lines(content.as_bytes()), vec![a]);
    }

    #[test]
    fn test_truncated_header_is_not_fatal() {
        let state = parse(b"=== nbs-chat ===\nlast-wri");
        assert!(state.messages.is_empty());
        assert_eq!(state.skipped, 1);

        let state = parse(b"");
        assert!(state.messages.is_empty());
        assert_eq!(state.header, Header::default());
    }

    #[test]
    fn test_participants_round_trip() {
        let parsed = parse_participants("alice(3), bob(1), broken, (2), eve(x)");
        assert_eq!(
            parsed,
            vec![
                Participant {
                    handle: "alice".into(),
                    count: 3
                },
                Participant {
                    handle: "bob".into(),
                    count: 1
                },
            ]
        );
        assert_eq!(format_participants(&parsed), "alice(3), bob(1)");
    }

    #[test]
    fn test_validate_handle() {
        for ok in ["alice", "claude-2", "a_b", &"x".repeat(MAX_HANDLE_LEN)] {
            assert!(validate_handle(ok).is_ok(), "{ok}");
        }
        for bad in ["", "a b", "a:b", "a|b", "a=b", "tab\t", &"x".repeat(MAX_HANDLE_LEN + 1)] {
            assert!(validate_handle(bad).is_err(), "{bad:?}");
        }
    }
}
