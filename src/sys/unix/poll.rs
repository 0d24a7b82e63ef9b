use std::io;
use std::os::raw::c_int;
use std::time::Duration;

use crate::poll_fn::{IoCondition, PollFd};

/// The default multiplexor: a direct `poll(2)` call.
///
/// `EINTR` is swallowed and reported as "nothing ready" — the caller (the
/// main context's iteration loop) simply loops back around to `prepare`.
pub fn poll(fds: &mut [PollFd], timeout: Option<Duration>) -> io::Result<c_int> {
    let mut raw: Vec<libc::pollfd> = fds
        .iter()
        .map(|pfd| libc::pollfd {
            fd: pfd.fd,
            events: to_raw_events(pfd.events),
            revents: 0,
        })
        .collect();

    let timeout_ms: c_int = match timeout {
        None => -1,
        Some(d) => c_int::try_from(d.as_millis()).unwrap_or(c_int::MAX),
    };

    let ret = unsafe { libc::poll(raw.as_mut_ptr(), raw.len() as libc::nfds_t, timeout_ms) };

    if ret < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            for pfd in fds.iter_mut() {
                pfd.revents = IoCondition::empty();
            }
            return Ok(0);
        }
        return Err(err);
    }

    for (pfd, raw_pfd) in fds.iter_mut().zip(raw.iter()) {
        pfd.revents = from_raw_events(raw_pfd.revents);
    }

    Ok(ret)
}

fn to_raw_events(cond: IoCondition) -> libc::c_short {
    let mut bits: libc::c_short = 0;
    if cond.contains(IoCondition::IN) {
        bits |= libc::POLLIN;
    }
    if cond.contains(IoCondition::OUT) {
        bits |= libc::POLLOUT;
    }
    if cond.contains(IoCondition::PRI) {
        bits |= libc::POLLPRI;
    }
    bits
}

fn from_raw_events(bits: libc::c_short) -> IoCondition {
    let mut cond = IoCondition::empty();
    if bits & libc::POLLIN != 0 {
        cond |= IoCondition::IN;
    }
    if bits & libc::POLLOUT != 0 {
        cond |= IoCondition::OUT;
    }
    if bits & libc::POLLPRI != 0 {
        cond |= IoCondition::PRI;
    }
    if bits & libc::POLLERR != 0 {
        cond |= IoCondition::ERR;
    }
    if bits & libc::POLLHUP != 0 {
        cond |= IoCondition::HUP;
    }
    if bits & libc::POLLNVAL != 0 {
        cond |= IoCondition::NVAL;
    }
    cond
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::io::{AsRawFd, FromRawFd};

    fn raw_pipe() -> (std::fs::File, std::fs::File) {
        let mut fds = [0 as c_int; 2];
        let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(ret, 0);
        unsafe { (std::fs::File::from_raw_fd(fds[0]), std::fs::File::from_raw_fd(fds[1])) }
    }

    #[test]
    fn poll_pipe_becomes_readable() {
        let (mut rd, mut wr) = raw_pipe();
        let mut fds = [PollFd::new(rd.as_raw_fd(), IoCondition::IN)];
        let n = poll(&mut fds, Some(Duration::from_millis(50))).unwrap();
        assert_eq!(n, 0);
        assert!(fds[0].revents.is_empty());

        wr.write_all(b"x").unwrap();
        let n = poll(&mut fds, Some(Duration::from_secs(1))).unwrap();
        assert_eq!(n, 1);
        assert!(fds[0].revents.contains(IoCondition::IN));
        let mut buf = [0u8; 1];
        rd.read_exact(&mut buf).unwrap();
    }
}
