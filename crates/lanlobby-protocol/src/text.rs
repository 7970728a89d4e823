//! Bounded-string helpers shared by the packet layout and the options codec.

/// Returns the longest prefix of `s` that is at most `max_bytes` long and
/// ends on a character boundary.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Returns the longest prefix of `s` that encodes to at most `max_units`
/// UTF-16 code units.
pub fn truncate_utf16(s: &str, max_units: usize) -> &str {
    let mut units = 0;
    for (i, c) in s.char_indices() {
        units += c.len_utf16();
        if units > max_units {
            return &s[..i];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_utf8_short_string_untouched() {
        assert_eq!(truncate_utf8("abc", 5), "abc");
    }

    #[test]
    fn test_truncate_utf8_respects_char_boundary() {
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(truncate_utf8("aé", 2), "a");
        assert_eq!(truncate_utf8("aé", 3), "aé");
    }

    #[test]
    fn test_truncate_utf16_counts_surrogate_pairs() {
        // U+1F600 needs two code units
        assert_eq!(truncate_utf16("a\u{1F600}b", 2), "a");
        assert_eq!(truncate_utf16("a\u{1F600}b", 3), "a\u{1F600}");
        assert_eq!(truncate_utf16("abcdef", 4), "abcd");
    }
}
