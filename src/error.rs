//! The error taxonomy.
//!
//! Recoverable I/O failures are carried as a typed [`Error`] paired, where
//! relevant, with the three/four-state [`Status`] that every channel
//! read/write entry point returns. Programming errors (reentrant
//! prepare/check, lock/unlock imbalance, a null callback where one is
//! required) are not represented here — they are diagnostics (`log::warn!`)
//! with a neutral return value, not an `Err`.

use std::fmt;

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Channel-specific error codes, modeled after a dedicated I/O-channel
/// error domain distinct from the general-purpose [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelErrorCode {
    #[error("file too large")]
    Fbig,
    #[error("invalid argument")]
    Inval,
    #[error("I/O error")]
    Io,
    #[error("is a directory")]
    Isdir,
    #[error("no space left on device")]
    Nospc,
    #[error("no such device or address")]
    Nxio,
    #[error("value too large")]
    Overflow,
    #[error("broken pipe")]
    Pipe,
    #[error("operation failed")]
    Failed,
}

#[cfg(unix)]
impl ChannelErrorCode {
    /// Maps an `errno` to the closest channel error code, falling back to
    /// `Failed` for anything not explicitly covered. Used by
    /// `IoChannel::error_from_errno`.
    pub fn from_errno(errno: i32) -> ChannelErrorCode {
        match errno {
            libc::EFBIG => ChannelErrorCode::Fbig,
            libc::EINVAL => ChannelErrorCode::Inval,
            libc::EISDIR => ChannelErrorCode::Isdir,
            libc::ENOSPC => ChannelErrorCode::Nospc,
            libc::ENXIO => ChannelErrorCode::Nxio,
            libc::EOVERFLOW => ChannelErrorCode::Overflow,
            libc::EPIPE => ChannelErrorCode::Pipe,
            libc::EIO => ChannelErrorCode::Io,
            _ => ChannelErrorCode::Failed,
        }
    }
}

#[cfg(not(unix))]
impl ChannelErrorCode {
    pub fn from_errno(_errno: i32) -> ChannelErrorCode {
        ChannelErrorCode::Failed
    }
}

/// The crate-wide recoverable error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A new OS thread could not be created.
    #[error("thread could not be created: {0}")]
    ResourceExhausted(#[source] std::io::Error),

    /// A bounded wait (`Cond::wait_until`, `AsyncQueue::timeout_pop`) reached
    /// its deadline.
    #[error("operation timed out")]
    Timeout,

    /// A non-blocking operation would have blocked.
    #[error("operation would block")]
    WouldBlock,

    /// End of channel reached.
    #[error("end of file")]
    Eof,

    /// A transport-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad flags, bad seek type, a mismatched encoding-transition
    /// precondition, seeking a non-seekable channel, or shrinking the
    /// buffer size below `MAX_CHAR_SIZE`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Leftover bytes at EOF that do not form a complete character.
    #[error("partial character sequence at end of input")]
    PartialInput,

    /// Bytes that do not decode in the channel's current encoding.
    #[error("illegal byte sequence for the current encoding")]
    IllegalSequence,

    /// An encoder/decoder could not be constructed for the requested
    /// encoding name.
    #[error("conversion could not be set up: {0}")]
    ConversionFailed(String),

    /// A channel-specific failure, carrying the dedicated error domain.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelErrorCode),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Error {
        Error::InvalidArgument(msg.into())
    }

    pub fn is_would_block(&self) -> bool {
        matches!(self, Error::WouldBlock)
            || matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::WouldBlock)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Eof)
    }
}

/// The three/four-state status every channel read/write entry point wraps
/// its result in: `Normal` carries a value, the other three are
/// terminal-ish signals the caller must not treat as opaque failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Normal,
    Eof,
    Again,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Normal => write!(f, "normal"),
            Status::Eof => write!(f, "eof"),
            Status::Again => write!(f, "again"),
            Status::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn would_block_detection() {
        let e = Error::WouldBlock;
        assert!(e.is_would_block());
        let io_e = Error::Io(std::io::Error::from(std::io::ErrorKind::WouldBlock));
        assert!(io_e.is_would_block());
        assert!(!Error::Eof.is_would_block());
    }

    #[test]
    fn channel_error_from_errno() {
        assert_eq!(ChannelErrorCode::from_errno(libc::EPIPE), ChannelErrorCode::Pipe);
        assert_eq!(ChannelErrorCode::from_errno(999_999), ChannelErrorCode::Failed);
    }
}
