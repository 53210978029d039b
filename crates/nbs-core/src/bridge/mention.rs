//! `@handle` mention extraction
//!
//! Works on raw bytes and only ever classifies ASCII, so any byte value next
//! to an `@` (including 0x80..=0xFF and NUL) is handled the same way: it is
//! simply not a handle or email character.

/// Most mentions taken from one message.
pub const MAX_MENTIONS: usize = 16;

/// Mentioned handles this long or longer are ignored.
pub const MAX_MENTION_LEN: usize = 64;

/// One addressee found in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub handle: String,
    /// Written as `@handle!`: the addressee should be interrupted.
    pub interrupt: bool,
}

fn is_handle_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn is_email_local_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b'+')
}

/// Distinct mentions in order of first appearance, at most [`MAX_MENTIONS`].
///
/// An `@` directly after an email local-part character (`user@host`) is not
/// a mention. For a repeated handle, the first occurrence decides whether it
/// is an interrupt.
pub fn extract_mentions(body: &[u8]) -> Vec<Mention> {
    let mut found: Vec<Mention> = Vec::new();
    let mut i = 0;

    while i < body.len() && found.len() < MAX_MENTIONS {
        if body[i] != b'@' || (i > 0 && is_email_local_byte(body[i - 1])) {
            i += 1;
            continue;
        }

        let start = i + 1;
        let end = body[start..]
            .iter()
            .position(|&b| !is_handle_byte(b))
            .map_or(body.len(), |n| start + n);
        let len = end - start;
        if len == 0 {
            i += 1;
            continue;
        }
        i = end;
        if len >= MAX_MENTION_LEN {
            continue;
        }

        // Handle bytes are ASCII, so this cannot fail.
        let Ok(handle) = std::str::from_utf8(&body[start..end]) else {
            continue;
        };
        if found.iter().any(|m| m.handle == handle) {
            continue;
        }
        found.push(Mention {
            handle: handle.to_string(),
            interrupt: body.get(end) == Some(&b'!'),
        });
    }
    found
}
