//! Line-terminator detection for [`super::IoChannel::read_line`].
//!
//! Autodetect recognizes LF, CRLF, CR, NUL and the Unicode paragraph
//! separator U+2029 (`\xE2\x80\xA9` in UTF-8). A bare CR at the very end of
//! the buffer is ambiguous — it might be the start of a CRLF pair that just
//! hasn't arrived yet — so it is only treated as a terminator once `eof` is
//! true; otherwise the search reports "not found yet" and the caller reads
//! more.

const PARAGRAPH_SEPARATOR: &[u8] = "\u{2029}".as_bytes();

/// A located terminator: `line_end` is the offset of the first byte after
/// the terminator (i.e. the length of the line including its terminator),
/// `term_len` is how many of those trailing bytes are the terminator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found {
    pub line_end: usize,
    pub term_len: usize,
}

/// Searches `buf` for a line terminator.
///
/// `explicit` overrides autodetection with a caller-supplied fixed
/// terminator. `eof` must be `true` once the transport has nothing left to
/// give, so a trailing bare CR (or, with no terminator found at all, the
/// remainder of the buffer) can be resolved instead of deferred forever.
pub fn find(buf: &[u8], explicit: Option<&[u8]>, eof: bool) -> Option<Found> {
    if let Some(term) = explicit {
        return buf.windows(term.len().max(1)).position(|w| w == term).map(|pos| Found {
            line_end: pos + term.len(),
            term_len: term.len(),
        });
    }

    let mut i = 0;
    while i < buf.len() {
        match buf[i] {
            b'\n' => {
                return Some(Found { line_end: i + 1, term_len: 1 });
            }
            b'\r' => {
                if i + 1 < buf.len() {
                    let term_len = if buf[i + 1] == b'\n' { 2 } else { 1 };
                    return Some(Found {
                        line_end: i + term_len,
                        term_len,
                    });
                } else if eof {
                    return Some(Found { line_end: i + 1, term_len: 1 });
                } else {
                    return None;
                }
            }
            0u8 => {
                return Some(Found { line_end: i + 1, term_len: 1 });
            }
            _ => {
                if buf[i..].starts_with(PARAGRAPH_SEPARATOR) {
                    return Some(Found {
                        line_end: i + PARAGRAPH_SEPARATOR.len(),
                        term_len: PARAGRAPH_SEPARATOR.len(),
                    });
                }
                i += 1;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_lf() {
        let found = find(b"hello\nworld", None, false).unwrap();
        assert_eq!(found, Found { line_end: 6, term_len: 1 });
    }

    #[test]
    fn finds_crlf() {
        let found = find(b"hello\r\nworld", None, false).unwrap();
        assert_eq!(found, Found { line_end: 7, term_len: 2 });
    }

    #[test]
    fn bare_cr_at_end_is_deferred_until_eof() {
        assert_eq!(find(b"hello\r", None, false), None);
        let found = find(b"hello\r", None, true).unwrap();
        assert_eq!(found, Found { line_end: 6, term_len: 1 });
    }

    #[test]
    fn finds_nul_and_paragraph_separator() {
        let with_nul = [b'h', b'i', 0u8, b'x'];
        assert_eq!(find(&with_nul, None, false), Some(Found { line_end: 3, term_len: 1 }));

        let mut with_sep = b"hi".to_vec();
        with_sep.extend_from_slice(PARAGRAPH_SEPARATOR);
        with_sep.extend_from_slice(b"more");
        let found = find(&with_sep, None, false).unwrap();
        assert_eq!(found.line_end, 2 + PARAGRAPH_SEPARATOR.len());
        assert_eq!(found.term_len, PARAGRAPH_SEPARATOR.len());
    }

    #[test]
    fn explicit_terminator_overrides_autodetect() {
        let found = find(b"a::b::c", Some(b"::"), false).unwrap();
        assert_eq!(found, Found { line_end: 3, term_len: 2 });
    }
}
