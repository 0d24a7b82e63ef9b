//! Async-signal-safe bookkeeping for Unix signal-watch sources.
//!
//! The handler itself only sets an atomic per-signal flag and writes one
//! byte to the worker's wakeup fd — both async-signal-safe operations.
//! Everything else (scanning flags, dispatching signal-watch sources) runs
//! from ordinary code on the worker context's thread.

use std::collections::HashMap;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::sync::Mutex;

const MAX_SIGNUM: usize = 64;

static PENDING: [AtomicBool; MAX_SIGNUM] = {
    #[allow(clippy::declare_interior_mutable_const)]
    const FALSE: AtomicBool = AtomicBool::new(false);
    [FALSE; MAX_SIGNUM]
};

/// Raw fd written to (one byte) whenever any watched signal arrives. Set by
/// the worker context before installing any handler.
static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

static INSTALLED: Mutex<Option<HashMap<c_int, Installation>>> = Mutex::new(None);

struct Installation {
    refs: usize,
    previous: libc::sigaction,
}

/// Sets the fd the signal handler writes to on delivery. Must be called
/// before `install` for the write to have any effect.
pub fn set_wake_fd(fd: c_int) {
    WAKE_FD.store(fd, Ordering::Release);
}

extern "C" fn handler(signum: c_int) {
    if (signum as usize) < MAX_SIGNUM {
        PENDING[signum as usize].store(true, Ordering::Release);
    }
    let fd = WAKE_FD.load(Ordering::Acquire);
    if fd >= 0 {
        let byte = 1u8;
        unsafe {
            libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
        }
    }
}

/// Refcounted installation of the minimal handler for `signum`.
pub fn install(signum: c_int) -> std::io::Result<()> {
    let mut guard = INSTALLED.lock();
    let map = guard.get_or_insert_with(HashMap::new);
    if let Some(entry) = map.get_mut(&signum) {
        entry.refs += 1;
        return Ok(());
    }

    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = handler as usize;
    unsafe {
        libc::sigemptyset(&mut action.sa_mask);
    }
    action.sa_flags = libc::SA_RESTART;

    let mut previous: libc::sigaction = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::sigaction(signum, &action, &mut previous) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }

    map.insert(signum, Installation { refs: 1, previous });
    Ok(())
}

/// Drops one reference; restores the previous handler when it reaches zero.
pub fn uninstall(signum: c_int) {
    let mut guard = INSTALLED.lock();
    let Some(map) = guard.as_mut() else { return };
    let Some(entry) = map.get_mut(&signum) else {
        return;
    };
    entry.refs -= 1;
    if entry.refs == 0 {
        let previous = entry.previous;
        map.remove(&signum);
        unsafe {
            libc::sigaction(signum, &previous, std::ptr::null_mut());
        }
    }
}

/// Returns and clears the pending flag for `signum`.
pub fn take_pending(signum: c_int) -> bool {
    if (signum as usize) >= MAX_SIGNUM {
        return false;
    }
    PENDING[signum as usize].swap(false, Ordering::AcqRel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_uninstall_is_refcounted() {
        // SIGUSR2 is not otherwise used by the test process.
        install(libc::SIGUSR2).unwrap();
        install(libc::SIGUSR2).unwrap();
        uninstall(libc::SIGUSR2);
        unsafe {
            libc::raise(libc::SIGUSR2);
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(take_pending(libc::SIGUSR2));
        uninstall(libc::SIGUSR2);
    }
}
