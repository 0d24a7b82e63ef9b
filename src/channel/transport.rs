//! The transport vtable an [`super::IoChannel`] reads and writes through.
//!
//! Grounded on `io_source.rs`'s `IoSource<T>` adapter: a thin wrapper that
//! knows how to turn a raw platform handle into the handful of operations
//! the channel core actually needs, without the core ever touching a raw fd
//! itself.

use std::io;

use crate::poll_fn::{IoCondition, PollFd, RawFd};

/// Seek origin, mirroring `std::io::SeekFrom` without pulling it into every
/// signature (a channel seek also has to reject non-seekable transports,
/// which `SeekFrom` itself has no room to express).
#[derive(Debug, Clone, Copy)]
pub enum SeekFrom {
    Start(u64),
    Current(i64),
    End(i64),
}

/// The set of operations an [`super::IoChannel`] needs from whatever it is
/// layered on top of: a POSIX fd, a Windows handle/socket, an in-memory
/// buffer for tests.
pub trait Transport: Send + Sync {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// `None` means this transport cannot seek.
    fn seek(&self, pos: SeekFrom) -> io::Result<Option<u64>>;

    fn close(&self) -> io::Result<()>;

    /// The pollable fd to watch for `condition`, for
    /// [`super::IoChannel::create_watch`]. `None` for transports (e.g. an
    /// in-memory buffer) that have nothing to poll.
    fn poll_fd(&self, condition: IoCondition) -> Option<PollFd>;

    fn is_seekable(&self) -> bool {
        false
    }
}

/// A [`Transport`] over a POSIX file descriptor the channel owns and closes.
#[cfg(unix)]
pub struct FdTransport {
    fd: RawFd,
    seekable: bool,
}

#[cfg(unix)]
impl FdTransport {
    /// Takes ownership of `fd`; it is closed when the transport is dropped
    /// or [`Transport::close`] is called, whichever happens first.
    pub fn new(fd: RawFd, seekable: bool) -> FdTransport {
        FdTransport { fd, seekable }
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd
    }
}

#[cfg(unix)]
impl Transport for FdTransport {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn seek(&self, pos: SeekFrom) -> io::Result<Option<u64>> {
        if !self.seekable {
            return Ok(None);
        }
        let (whence, offset) = match pos {
            SeekFrom::Start(n) => (libc::SEEK_SET, n as i64),
            SeekFrom::Current(n) => (libc::SEEK_CUR, n),
            SeekFrom::End(n) => (libc::SEEK_END, n),
        };
        let result = unsafe { libc::lseek(self.fd, offset, whence) };
        if result < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(Some(result as u64))
        }
    }

    fn close(&self) -> io::Result<()> {
        let ret = unsafe { libc::close(self.fd) };
        if ret != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn poll_fd(&self, condition: IoCondition) -> Option<PollFd> {
        Some(PollFd::new(self.fd, condition))
    }

    fn is_seekable(&self) -> bool {
        self.seekable
    }
}

/// An in-memory [`Transport`] useful for tests: a growable byte buffer that
/// is never seekable and never pollable.
pub struct MemoryTransport {
    read_side: std::sync::Mutex<std::collections::VecDeque<u8>>,
    written: std::sync::Mutex<Vec<u8>>,
}

impl MemoryTransport {
    pub fn new(initial: impl Into<Vec<u8>>) -> MemoryTransport {
        MemoryTransport {
            read_side: std::sync::Mutex::new(initial.into().into()),
            written: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

impl Transport for MemoryTransport {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut src = self.read_side.lock().unwrap();
        let n = buf.len().min(src.len());
        for slot in buf.iter_mut().take(n) {
            *slot = src.pop_front().unwrap();
        }
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn seek(&self, _pos: SeekFrom) -> io::Result<Option<u64>> {
        Ok(None)
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }

    fn poll_fd(&self, _condition: IoCondition) -> Option<PollFd> {
        None
    }
}
