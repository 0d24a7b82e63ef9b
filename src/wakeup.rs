//! [`Wakeup`]: the single-fd readiness token used to interrupt a blocked
//! poll from another thread.

use std::io;

use crate::poll_fn::PollFd;

/// An edge-triggered token one thread can use to force a blocked
/// [`MainContext`](crate::MainContext) poll to return.
///
/// `signal` is a non-blocking write; multiple signals before the next
/// `acknowledge` coalesce into a single wakeup.
#[derive(Debug)]
pub struct Wakeup {
    inner: crate::sys::Wakeup,
}

impl Wakeup {
    pub fn new() -> io::Result<Wakeup> {
        Ok(Wakeup {
            inner: crate::sys::Wakeup::new()?,
        })
    }

    /// The pollfd to register in a context's poll array, at priority 0.
    pub fn poll_fd(&self) -> PollFd {
        self.inner.poll_fd()
    }

    /// Forces a blocked poll on this wakeup's context to return. Idempotent.
    pub fn signal(&self) -> io::Result<()> {
        self.inner.signal()
    }

    /// Drains the token. Called once per iteration, after `poll` reports the
    /// wakeup's fd as ready.
    pub fn acknowledge(&self) -> io::Result<()> {
        self.inner.acknowledge()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn signal_then_poll_observes_readiness() {
        let w = Wakeup::new().unwrap();
        w.signal().unwrap();
        let mut fds = [w.poll_fd()];
        let n = crate::sys::poll(&mut fds, Some(Duration::from_secs(1))).unwrap();
        assert_eq!(n, 1);
        w.acknowledge().unwrap();
    }
}
