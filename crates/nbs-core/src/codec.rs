//! Line codec for chat message bodies
//!
//! Every stored message occupies exactly one line of printable ASCII: the
//! standard base64 alphabet with `=` padding. Any byte sequence survives the
//! round trip, including NUL, control characters and non-UTF-8 data, because
//! the codec never interprets byte values as characters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// A stored line could not be decoded.
///
/// Readers treat this as a local failure: the line is skipped and the rest
/// of the file is still processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("corrupt encoded line ({len} bytes): {reason}")]
pub struct CorruptData {
    pub len: usize,
    pub reason: String,
}

/// Encode `bytes` into a single line with no line terminator.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode one stored line back into the original bytes.
///
/// A trailing `\r` is tolerated so files edited on other platforms still
/// read back.
pub fn decode(line: &str) -> Result<Vec<u8>, CorruptData> {
    let trimmed = line.strip_suffix('\r').unwrap_or(line);
    STANDARD.decode(trimmed).map_err(|e| CorruptData {
        len: line.len(),
        reason: e.to_string(),
    })
}
