//! The pluggable multiplexor: [`PollFd`], [`IoCondition`] and [`PollFn`].
//!
//! The default [`PollFn`] wraps the platform's `poll`/`select`/
//! `WaitForMultipleObjectsEx` call (see [`sys::poll`](crate::sys::poll)); a
//! [`MainContext`](crate::MainContext) can be given a different one for
//! testing or for integrating a foreign event loop.

use std::fmt;
use std::os::raw::c_int;
use std::time::Duration;

/// A bitmask of the conditions a [`PollFd`] can request or report.
///
/// Mirrors the `POLL*` constants from `poll(2)`; `ERR`, `HUP` and `NVAL` are
/// only ever meaningful in `revents` — requesting them in `events` is a
/// no-op, and [`crate::context::MainContext::query`] masks them out of the
/// request side before building the platform poll array.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct IoCondition(u16);

const IN: u16 = 0b0_0000_0001;
const OUT: u16 = 0b0_0000_0010;
const PRI: u16 = 0b0_0000_0100;
const ERR: u16 = 0b0_0000_1000;
const HUP: u16 = 0b0_0001_0000;
const NVAL: u16 = 0b0_0010_0000;

impl IoCondition {
    /// Data other than high-priority data may be read without blocking.
    pub const IN: IoCondition = IoCondition(IN);
    /// Normal data may be written without blocking.
    pub const OUT: IoCondition = IoCondition(OUT);
    /// High-priority data may be read without blocking.
    pub const PRI: IoCondition = IoCondition(PRI);
    /// An error condition. Always reported in `revents`, ignored in `events`.
    pub const ERR: IoCondition = IoCondition(ERR);
    /// The peer closed its end. Always reported in `revents`.
    pub const HUP: IoCondition = IoCondition(HUP);
    /// The fd is not open. Always reported in `revents`.
    pub const NVAL: IoCondition = IoCondition(NVAL);
    /// The empty set.
    pub const EMPTY: IoCondition = IoCondition(0);

    pub const fn empty() -> IoCondition {
        IoCondition(0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: IoCondition) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: IoCondition) -> bool {
        self.0 & other.0 != 0
    }

    /// The subset that is always reported regardless of requested interest.
    pub(crate) const fn always_reported() -> IoCondition {
        IoCondition(ERR | HUP | NVAL)
    }

    pub(crate) const fn bits(self) -> u16 {
        self.0
    }

    pub(crate) const fn from_bits(bits: u16) -> IoCondition {
        IoCondition(bits)
    }
}

impl std::ops::BitOr for IoCondition {
    type Output = IoCondition;
    fn bitor(self, rhs: IoCondition) -> IoCondition {
        IoCondition(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for IoCondition {
    fn bitor_assign(&mut self, rhs: IoCondition) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for IoCondition {
    type Output = IoCondition;
    fn bitand(self, rhs: IoCondition) -> IoCondition {
        IoCondition(self.0 & rhs.0)
    }
}

impl std::ops::Sub for IoCondition {
    type Output = IoCondition;
    fn sub(self, rhs: IoCondition) -> IoCondition {
        IoCondition(self.0 & !rhs.0)
    }
}

impl fmt::Debug for IoCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut flag = |name: &str, bit: u16| -> fmt::Result {
            if self.0 & bit != 0 {
                if !first {
                    write!(f, "|")?;
                }
                first = false;
                write!(f, "{name}")?;
            }
            Ok(())
        };
        flag("IN", IN)?;
        flag("OUT", OUT)?;
        flag("PRI", PRI)?;
        flag("ERR", ERR)?;
        flag("HUP", HUP)?;
        flag("NVAL", NVAL)?;
        if first {
            write!(f, "EMPTY")?;
        }
        Ok(())
    }
}

/// The registration of one fd with a [`MainContext`](crate::MainContext).
///
/// Poll records are kept sorted by `fd` so the generated poll array is
/// monotonically ordered, which lets [`MainContext::check`](crate::context::MainContext::check)
/// merge `revents` back in with a single linear pass.
#[derive(Copy, Clone, Debug)]
pub struct PollFd {
    pub fd: RawFd,
    pub events: IoCondition,
    pub revents: IoCondition,
}

#[cfg(unix)]
pub type RawFd = std::os::unix::io::RawFd;
#[cfg(windows)]
pub type RawFd = std::os::windows::io::RawHandle;

impl PollFd {
    pub fn new(fd: RawFd, events: IoCondition) -> PollFd {
        PollFd {
            fd,
            events,
            revents: IoCondition::empty(),
        }
    }
}

/// A pluggable multiplexor matching `poll(fds[], nfds, timeout_ms) -> int`.
///
/// The default implementation ([`crate::sys::poll`]) wraps the platform's
/// native readiness call. Implementations must never block longer than
/// `timeout` (`None` means block indefinitely) and must treat `EINTR` as "no
/// fds ready" rather than propagating it, exactly as
/// [`MainContext::poll`](crate::context::MainContext) does.
pub trait PollFn: Send + Sync {
    /// Waits for readiness on `fds`, filling in `revents`. Returns the number
    /// of fds with a non-empty `revents`, or an I/O error.
    fn poll(&self, fds: &mut [PollFd], timeout: Option<Duration>) -> std::io::Result<c_int>;
}

/// The default [`PollFn`], backed by the platform's native call.
#[derive(Debug, Default)]
pub struct DefaultPollFn;

impl PollFn for DefaultPollFn {
    fn poll(&self, fds: &mut [PollFd], timeout: Option<Duration>) -> std::io::Result<c_int> {
        crate::sys::poll(fds, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_condition_bitor_and_contains() {
        let rw = IoCondition::IN | IoCondition::OUT;
        assert!(rw.contains(IoCondition::IN));
        assert!(rw.contains(IoCondition::OUT));
        assert!(!rw.contains(IoCondition::PRI));
        assert!(rw.intersects(IoCondition::IN));
    }

    #[test]
    fn io_condition_sub_removes_bits() {
        let mask = IoCondition::IN | IoCondition::ERR | IoCondition::HUP;
        let requestable = mask - IoCondition::always_reported();
        assert_eq!(requestable, IoCondition::IN);
    }

    #[test]
    fn empty_is_empty() {
        assert!(IoCondition::empty().is_empty());
        assert!(!IoCondition::IN.is_empty());
    }
}
