use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use crate::poll_fn::{IoCondition, PollFd};

/// A single-fd readiness token: one writer thread can force a blocked poller
/// to return.
///
/// Uses `eventfd` on Linux/Android (a single fd); a self-pipe elsewhere.
/// `signal` is a non-blocking write and is idempotent — multiple signals
/// before the next `acknowledge` coalesce into one wakeup, matching the
/// semantics `MainContext::wakeup` promises.
#[derive(Debug)]
pub struct Wakeup {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fd: File,
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    reader: File,
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    writer: File,
}

impl Wakeup {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn new() -> io::Result<Wakeup> {
        let fd = syscall!(eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK))?;
        Ok(Wakeup {
            fd: unsafe { File::from_raw_fd(fd) },
        })
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub fn new() -> io::Result<Wakeup> {
        let mut fds = [0 as libc::c_int; 2];
        syscall!(pipe(fds.as_mut_ptr()))?;
        for &fd in &fds {
            let flags = syscall!(fcntl(fd, libc::F_GETFL))?;
            syscall!(fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK))?;
            syscall!(fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC))?;
        }
        Ok(Wakeup {
            reader: unsafe { File::from_raw_fd(fds[0]) },
            writer: unsafe { File::from_raw_fd(fds[1]) },
        })
    }

    /// The fd to include in the poll array, with `IN` interest.
    pub fn poll_fd(&self) -> PollFd {
        PollFd::new(self.as_raw_fd(), IoCondition::IN)
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub fn as_raw_fd(&self) -> RawFd {
        self.reader.as_raw_fd()
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[allow(clippy::unused_io_amount)]
    pub fn signal(&self) -> io::Result<()> {
        let buf = 1u64.to_ne_bytes();
        match (&self.fd).write(&buf) {
            Ok(_) => Ok(()),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                // Counter about to overflow: drain and retry once.
                let _ = self.acknowledge();
                (&self.fd).write(&buf).map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    #[allow(clippy::unused_io_amount)]
    pub fn signal(&self) -> io::Result<()> {
        match (&self.writer).write(&[1u8]) {
            Ok(_) => Ok(()),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Drains the token so a subsequent `poll` blocks again.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[allow(clippy::unused_io_amount)]
    pub fn acknowledge(&self) -> io::Result<()> {
        let mut buf = [0u8; 8];
        match (&self.fd).read(&mut buf) {
            Ok(_) => Ok(()),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    #[allow(clippy::unused_io_amount)]
    pub fn acknowledge(&self) -> io::Result<()> {
        let mut buf = [0u8; 64];
        loop {
            match (&self.reader).read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) if n < buf.len() => return Ok(()),
                Ok(_) => continue,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_is_idempotent_and_acknowledge_drains() {
        let w = Wakeup::new().unwrap();
        w.signal().unwrap();
        w.signal().unwrap();
        w.signal().unwrap();
        w.acknowledge().unwrap();
        // A second acknowledge with nothing pending must not block or error.
        w.acknowledge().unwrap();
    }
}
