//! UTF-8 safe text helpers for event payloads.

/// Return the longest prefix of `text` that is at most `max_bytes` long and
/// ends on a character boundary.
///
/// Walks `char_indices()` so it builds on MSRV 1.85; `str::floor_char_boundary`
/// is not available there.
pub fn truncate_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let end = text
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_bytes_short_text_unchanged() {
        assert_eq!(truncate_bytes("hello", 5), "hello");
        assert_eq!(truncate_bytes("", 0), "");
    }

    #[test]
    fn truncate_bytes_ascii() {
        assert_eq!(truncate_bytes("hello world", 5), "hello");
        assert_eq!(truncate_bytes("hello", 0), "");
    }

    #[test]
    fn truncate_bytes_never_splits_a_char() {
        // "é" is 2 bytes, "中" is 3
        assert_eq!(truncate_bytes("aé", 2), "a");
        assert_eq!(truncate_bytes("aé", 3), "aé");
        assert_eq!(truncate_bytes("中中", 5), "中");
        assert_eq!(truncate_bytes("中", 2), "");
    }
}
