//! [`IoChannel`]: a buffered, encoding-converting byte stream over a
//! [`Transport`].
//!
//! Modeled on GLib's `GIOChannel`: the same four-buffer layout (raw read,
//! decoded read, write, a short partial-write stash), the same
//! encoding-transition legality rules, and the same line-terminator
//! autodetection.
//!
//! A channel's buffers only ever hold *decoded* text once an encoding is
//! set — `read_buf` carries whatever the transport gave back that hasn't
//! been validated/transcoded yet, `encoded_read_buf` carries the UTF-8 text
//! that has. With the null encoding there is no decoded buffer: `read_buf`
//! *is* the buffer callers read from.

pub mod encoding;
pub mod line;
pub mod transport;

use std::fmt;

use crate::context::MainContext;
use crate::error::{Error, Result, Status};
use crate::poll_fn::IoCondition;
use crate::source::{Callback, Continue, Source, SourceFuncs};
use crate::sync::Mutex;
use transport::{SeekFrom, Transport};

/// Longest possible encoded representation of one character that any
/// encoding this crate transcodes can produce — the floor for `buf_size`
/// and the size of `partial_write_buf`.
const MAX_CHAR_SIZE: usize = 6;

/// Default buffer size absent an explicit `set_buffer_size` call, matching
/// `G_IO_NICE_BUF_SIZE`.
const NICE_BUF_SIZE: usize = 1024;

enum LineTerm {
    Auto,
    Explicit(Vec<u8>),
}

/// A bitmask snapshot of a channel's current mode, mirroring
/// `GIOFlags` (`G_IO_FLAG_*`): which operations are legal on it and how it
/// is currently buffering.
///
/// Follows [`crate::poll_fn::IoCondition`]'s bit-pattern style rather than
/// pulling in a `bitflags`-style crate for five bits.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct ChannelFlags(u8);

const APPENDABLE: u8 = 0b0_0001;
const NONBLOCK: u8 = 0b0_0010;
const IS_READABLE: u8 = 0b0_0100;
const IS_WRITABLE: u8 = 0b0_1000;
const IS_SEEKABLE: u8 = 0b1_0000;

impl ChannelFlags {
    pub const APPENDABLE: ChannelFlags = ChannelFlags(APPENDABLE);
    pub const NONBLOCK: ChannelFlags = ChannelFlags(NONBLOCK);
    /// Set when the channel can be read from. Read-only: cleared on
    /// `set_flags` regardless of the bits passed in, since readability
    /// comes from the transport, not from channel configuration.
    pub const IS_READABLE: ChannelFlags = ChannelFlags(IS_READABLE);
    /// Set when the channel can be written to. Read-only, same as
    /// [`ChannelFlags::IS_READABLE`].
    pub const IS_WRITABLE: ChannelFlags = ChannelFlags(IS_WRITABLE);
    /// Set when the underlying transport supports seeking. Read-only, same
    /// as [`ChannelFlags::IS_READABLE`].
    pub const IS_SEEKABLE: ChannelFlags = ChannelFlags(IS_SEEKABLE);

    pub const fn empty() -> ChannelFlags {
        ChannelFlags(0)
    }

    pub const fn contains(self, other: ChannelFlags) -> bool {
        self.0 & other.0 == other.0
    }

    const fn union(self, other: ChannelFlags) -> ChannelFlags {
        ChannelFlags(self.0 | other.0)
    }

    const fn mutable_bits() -> ChannelFlags {
        ChannelFlags(APPENDABLE | NONBLOCK)
    }
}

impl std::ops::BitOr for ChannelFlags {
    type Output = ChannelFlags;
    fn bitor(self, rhs: ChannelFlags) -> ChannelFlags {
        self.union(rhs)
    }
}

impl fmt::Debug for ChannelFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        for (flag, name) in [
            (ChannelFlags::APPENDABLE, "APPENDABLE"),
            (ChannelFlags::NONBLOCK, "NONBLOCK"),
            (ChannelFlags::IS_READABLE, "IS_READABLE"),
            (ChannelFlags::IS_WRITABLE, "IS_WRITABLE"),
            (ChannelFlags::IS_SEEKABLE, "IS_SEEKABLE"),
        ] {
            if self.contains(flag) {
                names.push(name);
            }
        }
        write!(f, "ChannelFlags({})", names.join(" | "))
    }
}

struct ChannelState {
    read_buf: Vec<u8>,
    encoded_read_buf: String,
    write_buf: Vec<u8>,
    partial_write_buf: Vec<u8>,
    encoding: encoding::Mode,
    line_term: LineTerm,
    buf_size: usize,
    use_buffer: bool,
    at_eof: bool,
    closed: bool,
    mode_flags: ChannelFlags,
}

impl ChannelState {
    fn active_read_buf_len(&self) -> usize {
        match self.encoding {
            encoding::Mode::Raw => self.read_buf.len(),
            _ => self.encoded_read_buf.len(),
        }
    }
}

/// A buffered, encoding-aware channel over any [`Transport`].
pub struct IoChannel {
    transport: Box<dyn Transport>,
    state: Mutex<ChannelState>,
    is_readable: bool,
    is_writable: bool,
    close_on_unref: bool,
}

impl IoChannel {
    pub fn new(transport: Box<dyn Transport>, is_readable: bool, is_writable: bool) -> IoChannel {
        log::trace!("IoChannel created, readable={is_readable} writable={is_writable}");
        IoChannel {
            transport,
            state: Mutex::new(ChannelState {
                read_buf: Vec::new(),
                encoded_read_buf: String::new(),
                write_buf: Vec::new(),
                partial_write_buf: Vec::new(),
                encoding: encoding::Mode::Utf8,
                line_term: LineTerm::Auto,
                buf_size: NICE_BUF_SIZE,
                use_buffer: true,
                at_eof: false,
                closed: false,
                mode_flags: ChannelFlags::empty(),
            }),
            is_readable,
            is_writable,
            close_on_unref: true,
        }
    }

    pub fn is_seekable(&self) -> bool {
        self.transport.is_seekable()
    }

    pub fn is_readable(&self) -> bool {
        self.is_readable
    }

    pub fn is_writable(&self) -> bool {
        self.is_writable
    }

    /// The channel's current mode as a bitmask: the read-only `IS_*` bits
    /// report the transport's capabilities, the mutable `APPENDABLE`/
    /// `NONBLOCK` bits report what [`IoChannel::set_flags`] last set.
    pub fn get_flags(&self) -> ChannelFlags {
        let mut flags = self.state.lock().mode_flags;
        if self.is_readable {
            flags = flags.union(ChannelFlags::IS_READABLE);
        }
        if self.is_writable {
            flags = flags.union(ChannelFlags::IS_WRITABLE);
        }
        if self.is_seekable() {
            flags = flags.union(ChannelFlags::IS_SEEKABLE);
        }
        flags
    }

    /// Sets the mutable `APPENDABLE`/`NONBLOCK` bits; the `IS_*` read-only
    /// bits in `flags` are ignored, matching `g_io_channel_set_flags`
    /// silently masking them out rather than rejecting the call.
    pub fn set_flags(&self, flags: ChannelFlags) {
        self.state.lock().mode_flags = ChannelFlags(flags.0 & ChannelFlags::mutable_bits().0);
    }

    /// Whether `close` runs automatically when the last reference is
    /// dropped (always true here — there is no separate unref step once
    /// ownership is `Arc`-based, so this just governs whether `Drop`
    /// closes the transport).
    pub fn set_close_on_unref(&mut self, close: bool) {
        self.close_on_unref = close;
    }

    /// Changes the channel's encoding. Only legal with both buffers empty,
    /// on a write-only channel, or while recovering from an encoding error
    /// — anything else risks splitting a character across the transition.
    pub fn set_encoding(&self, name: Option<&str>) -> Result<()> {
        let mut state = self.state.lock();
        let buffers_idle = state.read_buf.is_empty() && state.encoded_read_buf.is_empty();
        if self.is_readable && !buffers_idle {
            return Err(Error::invalid_argument(
                "cannot change encoding while the read buffer holds undelivered data",
            ));
        }
        state.encoding = encoding::resolve(name)?;
        Ok(())
    }

    pub fn encoding_name(&self) -> Option<String> {
        self.state.lock().encoding.name().map(str::to_owned)
    }

    /// Enables or disables internal buffering. Only legal with both buffers
    /// empty and the null encoding.
    pub fn set_buffered(&self, buffered: bool) -> Result<()> {
        let mut state = self.state.lock();
        if !buffered {
            let idle = state.read_buf.is_empty() && state.write_buf.is_empty() && state.encoded_read_buf.is_empty();
            if !idle || !matches!(state.encoding, encoding::Mode::Raw) {
                return Err(Error::invalid_argument("cannot disable buffering with pending data or a non-null encoding"));
            }
        }
        state.use_buffer = buffered;
        Ok(())
    }

    pub fn buffered(&self) -> bool {
        self.state.lock().use_buffer
    }

    pub fn set_buffer_size(&self, size: usize) -> Result<()> {
        if size < MAX_CHAR_SIZE {
            return Err(Error::invalid_argument(format!("buffer size must be at least {MAX_CHAR_SIZE}")));
        }
        self.state.lock().buf_size = size;
        Ok(())
    }

    pub fn buffer_size(&self) -> usize {
        self.state.lock().buf_size
    }

    pub fn set_line_term(&self, term: Option<&[u8]>) -> Result<()> {
        if term.is_some_and(<[u8]>::is_empty) {
            return Err(Error::invalid_argument("line terminator cannot be empty, use None for autodetect"));
        }
        self.state.lock().line_term = match term {
            Some(t) => LineTerm::Explicit(t.to_vec()),
            None => LineTerm::Auto,
        };
        Ok(())
    }

    pub fn line_term(&self) -> Option<Vec<u8>> {
        match &self.state.lock().line_term {
            LineTerm::Auto => None,
            LineTerm::Explicit(t) => Some(t.clone()),
        }
    }

    /// Pulls more bytes from the transport into `read_buf`, then advances
    /// the decode pipeline as far as it will go. Returns the status of the
    /// fill itself (not of any later operation built on top of it).
    fn fill_buffer(&self, state: &mut ChannelState) -> Status {
        if state.at_eof {
            return Status::Eof;
        }
        let mut chunk = vec![0u8; state.buf_size];
        match self.transport.read(&mut chunk) {
            Ok(0) => {
                state.at_eof = true;
            }
            Ok(n) => {
                state.read_buf.extend_from_slice(&chunk[..n]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Status::Again,
            Err(_) => return Status::Error,
        }
        if self.advance_decode(state).is_err() {
            return Status::Error;
        }
        Status::Normal
    }

    /// Moves as much of `read_buf` as is decodable into `encoded_read_buf`,
    /// leaving any trailing partial character in `read_buf` for next time.
    /// An illegal byte sequence is reported once and otherwise leaves the
    /// buffers untouched, so a caller that treats the error as recoverable
    /// (per `set_encoding`'s error-recovery exception) can still see and
    /// discard the offending bytes.
    fn advance_decode(&self, state: &mut ChannelState) -> Result<()> {
        match &mut state.encoding {
            encoding::Mode::Raw => Ok(()),
            encoding::Mode::Utf8 => {
                let (valid_len, _needs_more) = encoding::validate_utf8_prefix(&state.read_buf)?;
                if valid_len > 0 {
                    let text = std::str::from_utf8(&state.read_buf[..valid_len]).unwrap();
                    state.encoded_read_buf.push_str(text);
                    state.read_buf.drain(..valid_len);
                }
                Ok(())
            }
            encoding::Mode::External { decoder, .. } => {
                let mut out = String::with_capacity(state.read_buf.len());
                let (result, read) = decoder.decode_to_string_without_replacement(&state.read_buf, &mut out, state.at_eof);
                state.encoded_read_buf.push_str(&out);
                state.read_buf.drain(..read);
                match result {
                    encoding_rs::DecoderResult::Malformed(_, _) => Err(Error::IllegalSequence),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Returns up to `n` bytes, never splitting a multi-byte character when
    /// an encoding is set.
    pub fn read_chars(&self, n: usize) -> (Status, Vec<u8>) {
        let mut state = self.state.lock();
        loop {
            if state.active_read_buf_len() > 0 || state.at_eof {
                break;
            }
            match self.fill_buffer(&mut state) {
                Status::Again => return (Status::Again, Vec::new()),
                Status::Error => return (Status::Error, Vec::new()),
                _ => {}
            }
        }

        match &mut state.encoding {
            encoding::Mode::Raw => {
                let take = n.min(state.read_buf.len());
                if take == 0 && state.at_eof {
                    return (Status::Eof, Vec::new());
                }
                (Status::Normal, state.read_buf.drain(..take).collect())
            }
            _ => {
                let byte_cap = n.min(state.encoded_read_buf.len());
                let take = floor_char_boundary(&state.encoded_read_buf, byte_cap);
                if take == 0 && state.at_eof {
                    return (Status::Eof, Vec::new());
                }
                let text: String = state.encoded_read_buf.drain(..take).collect();
                (Status::Normal, text.into_bytes())
            }
        }
    }

    /// Returns one decoded character, erasing its bytes from the buffer.
    pub fn read_unichar(&self) -> (Status, Option<char>) {
        let mut state = self.state.lock();
        loop {
            if let encoding::Mode::Raw = state.encoding {
                return (Status::Error, None);
            }
            if let Some(c) = state.encoded_read_buf.chars().next() {
                state.encoded_read_buf.drain(..c.len_utf8());
                return (Status::Normal, Some(c));
            }
            if state.at_eof {
                return (Status::Eof, None);
            }
            match self.fill_buffer(&mut state) {
                Status::Again => return (Status::Again, None),
                Status::Error => return (Status::Error, None),
                _ => {}
            }
        }
    }

    /// Returns bytes through the first line terminator (inclusive), or
    /// everything through EOF if none is found.
    pub fn read_line(&self) -> (Status, Vec<u8>) {
        let mut state = self.state.lock();
        loop {
            let (found, raw_mode) = match &state.encoding {
                encoding::Mode::Raw => (self.search_line_term(&state, true), true),
                _ => (self.search_line_term(&state, false), false),
            };
            if let Some(found) = found {
                let bytes = if raw_mode {
                    state.read_buf.drain(..found.line_end).collect::<Vec<u8>>()
                } else {
                    let text: String = state.encoded_read_buf.drain(..found.line_end).collect();
                    text.into_bytes()
                };
                return (Status::Normal, bytes);
            }
            if state.at_eof {
                let remaining = state.active_read_buf_len();
                if remaining == 0 {
                    return (Status::Eof, Vec::new());
                }
                return self.drain_remaining_as_line(&mut state);
            }
            match self.fill_buffer(&mut state) {
                Status::Again => return (Status::Again, Vec::new()),
                Status::Error => return (Status::Error, Vec::new()),
                _ => {}
            }
        }
    }

    fn search_line_term(&self, state: &ChannelState, raw: bool) -> Option<line::Found> {
        let explicit = match &state.line_term {
            LineTerm::Explicit(t) => Some(t.as_slice()),
            LineTerm::Auto => None,
        };
        let buf: &[u8] = if raw { &state.read_buf } else { state.encoded_read_buf.as_bytes() };
        line::find(buf, explicit, state.at_eof)
    }

    fn drain_remaining_as_line(&self, state: &mut ChannelState) -> (Status, Vec<u8>) {
        match &state.encoding {
            encoding::Mode::Raw => (Status::Normal, std::mem::take(&mut state.read_buf)),
            _ => {
                if !state.read_buf.is_empty() {
                    return (Status::Error, Vec::new());
                }
                let text = std::mem::take(&mut state.encoded_read_buf);
                (Status::Normal, text.into_bytes())
            }
        }
    }

    /// Drains the channel until EOF. A trailing partial character under a
    /// non-null encoding is [`Error::PartialInput`], reported as
    /// [`Status::Error`].
    pub fn read_to_end(&self) -> (Status, Vec<u8>) {
        let mut state = self.state.lock();
        loop {
            if state.at_eof {
                break;
            }
            match self.fill_buffer(&mut state) {
                Status::Again => return (Status::Again, Vec::new()),
                Status::Error => return (Status::Error, Vec::new()),
                _ => {}
            }
        }
        if !matches!(state.encoding, encoding::Mode::Raw) && !state.read_buf.is_empty() {
            return (Status::Error, Vec::new());
        }
        let out = match &mut state.encoding {
            encoding::Mode::Raw => std::mem::take(&mut state.read_buf),
            _ => std::mem::take(&mut state.encoded_read_buf).into_bytes(),
        };
        (Status::Normal, out)
    }

    /// Writes `data` (always UTF-8 per contract, even under a non-UTF-8
    /// encoding) into the write buffer, transcoding as needed, and flushes
    /// opportunistically once the buffer would otherwise grow past
    /// `buf_size - MAX_CHAR_SIZE`.
    pub fn write_chars(&self, data: &[u8]) -> (Status, usize) {
        if !self.is_writable {
            return (Status::Error, 0);
        }
        let mut state = self.state.lock();
        let mut pending = state.partial_write_buf.clone();
        pending.extend_from_slice(data);

        let (encoded, consumed_of_input, leftover) = match &mut state.encoding {
            encoding::Mode::Raw => (pending.clone(), data.len(), Vec::new()),
            encoding::Mode::Utf8 => match encoding::validate_utf8_prefix(&pending) {
                Ok((valid, _)) => {
                    let leftover = pending[valid..].to_vec();
                    (pending[..valid].to_vec(), data.len() - leftover.len().min(data.len()), leftover)
                }
                Err(_) => return (Status::Error, 0),
            },
            encoding::Mode::External { encoder, .. } => {
                let text = match std::str::from_utf8(&pending) {
                    Ok(t) => t,
                    Err(e) => std::str::from_utf8(&pending[..e.valid_up_to()]).unwrap(),
                };
                let mut out = Vec::with_capacity(text.len());
                let (_result, read, _had_replacements) = encoder.encode_from_utf8_to_vec(text, &mut out, true);
                let leftover = pending[read..].to_vec();
                (out, data.len().saturating_sub(leftover.len()), leftover)
            }
        };

        state.partial_write_buf = leftover;
        state.write_buf.extend_from_slice(&encoded);

        let high_water = state.buf_size.saturating_sub(MAX_CHAR_SIZE);
        if state.write_buf.len() > high_water {
            if self.flush_locked(&mut state) == Status::Error {
                return (Status::Error, 0);
            }
        }
        (Status::Normal, consumed_of_input)
    }

    fn flush_locked(&self, state: &mut ChannelState) -> Status {
        while !state.write_buf.is_empty() {
            match self.transport.write(&state.write_buf) {
                Ok(0) => return Status::Error,
                Ok(n) => {
                    state.write_buf.drain(..n);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Status::Again,
                Err(_) => return Status::Error,
            }
        }
        Status::Normal
    }

    pub fn flush(&self) -> Status {
        let mut state = self.state.lock();
        self.flush_locked(&mut state)
    }

    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        let mut state = self.state.lock();
        if self.flush_locked(&mut state) == Status::Error {
            return Err(Error::Channel(crate::error::ChannelErrorCode::Io));
        }
        state.read_buf.clear();
        state.encoded_read_buf.clear();
        state.at_eof = false;
        self.transport
            .seek(pos)?
            .ok_or_else(|| Error::invalid_argument("transport is not seekable"))
    }

    /// Flushes any buffered writes, optionally discarding unwritten data
    /// (`flush = false`) or pending unread data, then marks the channel
    /// closed. The underlying transport is released.
    pub fn shutdown(&self, flush: bool) -> Status {
        let mut state = self.state.lock();
        if state.closed {
            return Status::Normal;
        }
        let status = if flush { self.flush_locked(&mut state) } else { Status::Normal };
        state.closed = true;
        status
    }

    pub fn close(&self) -> Status {
        let status = self.shutdown(true);
        if let Err(e) = self.transport.close() {
            log::warn!("error closing channel transport: {e}");
            return Status::Error;
        }
        status
    }

    /// Attaches a [`Source`] to `context` that dispatches `callback`
    /// whenever `condition` is satisfied on the channel's transport.
    /// Returns `None` for transports with nothing pollable (e.g. an
    /// in-memory buffer).
    pub fn create_watch<F>(&self, context: &MainContext, condition: IoCondition, mut callback: F) -> Option<crate::source::SourceId>
    where
        F: FnMut(IoCondition) -> Continue + Send + 'static,
    {
        let poll_fd = self.transport.poll_fd(condition)?;
        let source = Source::new(ChannelWatchFuncs);
        let tag = source.add_unix_fd(poll_fd.fd, condition);
        source.set_callback(Callback::new(move |src| callback(src.query_unix_fd(tag))));
        Some(context.attach(source))
    }
}

struct ChannelWatchFuncs;

impl SourceFuncs for ChannelWatchFuncs {
    fn dispatch(&self, source: &Source) -> Continue {
        source.invoke_callback()
    }
}

/// Like `str::floor_char_boundary` (nightly-only in std): the largest index
/// `<= index` that lies on a UTF-8 character boundary.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::MemoryTransport;

    fn channel(data: &[u8]) -> IoChannel {
        IoChannel::new(Box::new(MemoryTransport::new(data.to_vec())), true, true)
    }

    #[test]
    fn reads_lines_with_mixed_terminators() {
        let ch = channel(b"hello\r\nworld\n");
        let (status, line) = ch.read_line();
        assert_eq!(status, Status::Normal);
        assert_eq!(line, b"hello\r\n");

        let (status, line) = ch.read_line();
        assert_eq!(status, Status::Normal);
        assert_eq!(line, b"world\n");

        let (status, _) = ch.read_line();
        assert_eq!(status, Status::Eof);
    }

    #[test]
    fn partial_utf8_at_eof_is_an_error() {
        let ch = channel(&[0xE2, 0x82]);
        let (status, _) = ch.read_to_end();
        assert_eq!(status, Status::Error);
    }

    #[test]
    fn write_then_read_back_through_identity_transport() {
        let transport = std::sync::Arc::new(MemoryTransport::new(Vec::new()));
        let ch = IoChannel::new(Box::new(SharedMemoryTransport(std::sync::Arc::clone(&transport))), false, true);
        let (status, n) = ch.write_chars(b"hello");
        assert_eq!(status, Status::Normal);
        assert_eq!(n, 5);
        assert_eq!(ch.flush(), Status::Normal);
        assert_eq!(transport.written(), b"hello");
    }

    #[test]
    fn get_flags_reports_capabilities_and_set_flags_mode_bits() {
        let ch = channel(b"abc");
        let flags = ch.get_flags();
        assert!(flags.contains(ChannelFlags::IS_READABLE));
        assert!(flags.contains(ChannelFlags::IS_WRITABLE));
        assert!(!flags.contains(ChannelFlags::IS_SEEKABLE));
        assert!(!flags.contains(ChannelFlags::NONBLOCK));

        ch.set_flags(ChannelFlags::NONBLOCK);
        assert!(ch.get_flags().contains(ChannelFlags::NONBLOCK));

        // IS_READABLE is read-only: passing it to set_flags must not stick.
        ch.set_flags(ChannelFlags::IS_READABLE);
        assert!(!ch.get_flags().contains(ChannelFlags::NONBLOCK));
        assert!(ch.get_flags().contains(ChannelFlags::IS_READABLE));
    }

    #[test]
    fn set_encoding_rejects_pending_read_data() {
        let ch = channel(b"abc");
        let (status, bytes) = ch.read_chars(1);
        assert_eq!(status, Status::Normal);
        assert_eq!(bytes, b"a");
        assert!(ch.set_encoding(Some("ISO-8859-1")).is_err());
    }

    #[test]
    fn buffer_size_floor_is_enforced() {
        let ch = channel(b"");
        assert!(ch.set_buffer_size(1).is_err());
        assert!(ch.set_buffer_size(MAX_CHAR_SIZE).is_ok());
    }

    #[test]
    fn malformed_bytes_in_a_named_encoding_are_an_error() {
        // 0x81 is one of windows-1252's handful of unassigned byte values.
        let ch = channel(&[0x41, 0x81]);
        ch.set_encoding(Some("windows-1252")).unwrap();
        let (status, _) = ch.read_chars(10);
        assert_eq!(status, Status::Error);
    }

    struct SharedMemoryTransport(std::sync::Arc<MemoryTransport>);
    impl Transport for SharedMemoryTransport {
        fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.0.read(buf)
        }
        fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.write(buf)
        }
        fn seek(&self, pos: SeekFrom) -> std::io::Result<Option<u64>> {
            self.0.seek(pos)
        }
        fn close(&self) -> std::io::Result<()> {
            self.0.close()
        }
        fn poll_fd(&self, condition: IoCondition) -> Option<crate::poll_fn::PollFd> {
            self.0.poll_fd(condition)
        }
    }
}
