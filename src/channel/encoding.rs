//! Encoding conversion for [`super::IoChannel`].
//!
//! UTF-8 (the default) is handled by hand: a channel with UTF-8 or no
//! encoding set never needs transcoding, only validation, so the read/write
//! pipelines just check character-boundary alignment with
//! `std::str::from_utf8`. Any other named encoding goes through
//! `encoding_rs`, the ecosystem's standard transcoding crate — stateful
//! `Decoder`/`Encoder` instances are kept on the channel so multi-call BOM
//! sniffing and incomplete sequences carry over between reads exactly the
//! way the streaming API expects.

use crate::error::{Error, Result};

/// How a channel's bytes relate to the UTF-8 text its read/write API deals
/// in.
pub enum Mode {
    /// No conversion: raw bytes pass through unvalidated, unaligned to any
    /// character boundary.
    Raw,
    /// Bytes are UTF-8; validated but never transcoded.
    Utf8,
    /// Bytes are in `encoding`; transcoded to/from UTF-8 via `encoding_rs`.
    External {
        encoding: &'static encoding_rs::Encoding,
        decoder: encoding_rs::Decoder,
        encoder: encoding_rs::Encoder,
    },
}

impl Mode {
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Mode::Raw => None,
            Mode::Utf8 => Some("UTF-8"),
            Mode::External { encoding, .. } => Some(encoding.name()),
        }
    }
}

/// Resolves an encoding name the way `set_encoding` accepts it: `None` (or
/// the literal string `"UTF-8"`) selects [`Mode::Utf8`]; any other name is
/// looked up via `encoding_rs`'s label table.
pub fn resolve(name: Option<&str>) -> Result<Mode> {
    match name {
        None => Ok(Mode::Utf8),
        Some(n) if n.eq_ignore_ascii_case("utf-8") || n.eq_ignore_ascii_case("utf8") => Ok(Mode::Utf8),
        Some(n) => {
            let encoding = encoding_rs::Encoding::for_label(n.as_bytes())
                .ok_or_else(|| Error::ConversionFailed(n.to_string()))?;
            Ok(Mode::External {
                encoding,
                decoder: encoding.new_decoder(),
                encoder: encoding.new_encoder(),
            })
        }
    }
}

/// Validates the longest complete-character UTF-8 prefix of `buf`.
///
/// Returns `(valid_len, needs_more)`: `valid_len` bytes are safe to move
/// into the decoded-text buffer as-is; `needs_more` is `true` when the
/// remainder is an incomplete (not malformed) multi-byte sequence that
/// might still complete once more bytes arrive. A malformed sequence is
/// reported as [`Error::IllegalSequence`].
pub fn validate_utf8_prefix(buf: &[u8]) -> Result<(usize, bool)> {
    match std::str::from_utf8(buf) {
        Ok(_) => Ok((buf.len(), false)),
        Err(e) => {
            let valid_len = e.valid_up_to();
            match e.error_len() {
                None => Ok((valid_len, true)),
                Some(_) => Err(Error::IllegalSequence),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_named_explicitly_resolves_to_utf8_mode() {
        assert!(matches!(resolve(Some("utf-8")).unwrap(), Mode::Utf8));
        assert!(matches!(resolve(None).unwrap(), Mode::Utf8));
    }

    #[test]
    fn unknown_encoding_name_fails() {
        assert!(resolve(Some("not-a-real-encoding")).is_err());
    }

    #[test]
    fn known_external_encoding_resolves() {
        let mode = resolve(Some("ISO-8859-1")).unwrap();
        assert_eq!(mode.name(), Some("windows-1252"));
    }

    #[test]
    fn full_valid_utf8_needs_nothing_more() {
        assert_eq!(validate_utf8_prefix("héllo".as_bytes()).unwrap(), ("héllo".len(), false));
    }

    #[test]
    fn truncated_multibyte_char_awaits_more_input() {
        let euro = "€".as_bytes(); // 0xE2 0x82 0xAC
        let (valid, needs_more) = validate_utf8_prefix(&euro[..2]).unwrap();
        assert_eq!(valid, 0);
        assert!(needs_more);
    }

    #[test]
    fn malformed_byte_is_illegal_sequence() {
        assert!(validate_utf8_prefix(&[0xFF, 0xFE]).is_err());
    }
}
