//! A source that dispatches once a child process exits.
//!
//! Unix only. `SIGCHLD`'s async-signal-safe handler is the same shared stub
//! used by [`unix_signal`](super::unix_signal) — it only flags that *some*
//! child changed state and wakes the worker. This source's `check` then
//! calls `waitpid(pid, WNOHANG)` for its own specific `pid`, so many watches
//! on unrelated children sharing one `SIGCHLD` delivery each reap only their
//! own process.

#![cfg(unix)]

use std::os::raw::c_int;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use crate::context::MainContext;
use crate::source::{Callback, Continue, Priority, Source, SourceFuncs, SourceId};
use crate::sys::unix_signal;

/// A child's exit status, as returned by `waitpid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildStatus(pub c_int);

impl ChildStatus {
    pub fn exit_code(self) -> Option<c_int> {
        if unsafe { libc::WIFEXITED(self.0) } {
            Some(unsafe { libc::WEXITSTATUS(self.0) })
        } else {
            None
        }
    }

    pub fn signal(self) -> Option<c_int> {
        if unsafe { libc::WIFSIGNALED(self.0) } {
            Some(unsafe { libc::WTERMSIG(self.0) })
        } else {
            None
        }
    }
}

struct ChildWatchFuncs {
    pid: libc::pid_t,
    status: AtomicI32,
    reaped: std::sync::atomic::AtomicBool,
}

const NOT_REAPED: i32 = i32::MIN;

impl SourceFuncs for ChildWatchFuncs {
    fn prepare(&self, _source: &Source) -> (bool, Option<Duration>) {
        (self.try_reap(), None)
    }

    fn check(&self, _source: &Source) -> bool {
        self.try_reap()
    }

    fn dispatch(&self, source: &Source) -> Continue {
        source.invoke_callback();
        false
    }

    fn finalize(&self, _source: &Source) {
        unix_signal::uninstall(libc::SIGCHLD);
    }
}

impl ChildWatchFuncs {
    fn try_reap(&self) -> bool {
        if self.reaped.load(Ordering::Acquire) {
            return true;
        }
        let mut status: c_int = 0;
        let ret = unsafe { libc::waitpid(self.pid, &mut status, libc::WNOHANG) };
        if ret == self.pid {
            self.status.store(status, Ordering::Release);
            self.reaped.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    fn status(&self) -> ChildStatus {
        ChildStatus(self.status.load(Ordering::Acquire))
    }
}

/// Watches `pid` for exit, running `callback` with its [`ChildStatus`]
/// exactly once, then removing the source. `SIGCHLD`'s handler is installed
/// (refcounted, shared with every other watch in the process) for the
/// lifetime of the source.
pub fn child_watch_add_full<F>(context: &MainContext, priority: Priority, pid: libc::pid_t, callback: F) -> std::io::Result<SourceId>
where
    F: FnOnce(ChildStatus) + Send + 'static,
{
    unix_signal::install(libc::SIGCHLD)?;
    let funcs = std::sync::Arc::new(ChildWatchFuncs {
        pid,
        status: AtomicI32::new(NOT_REAPED),
        reaped: std::sync::atomic::AtomicBool::new(false),
    });
    let dispatch_funcs = std::sync::Arc::clone(&funcs);
    let mut callback = Some(callback);

    let source = Source::new(ChildWatchFuncsWrapper(funcs));
    source.set_priority(priority);
    source.set_callback(Callback::new(move |_src| {
        if let Some(f) = callback.take() {
            f(dispatch_funcs.status());
        }
        false
    }));
    Ok(context.attach(source))
}

/// Wraps `ChildWatchFuncs` behind an `Arc` so both the `Source`'s
/// `SourceFuncs` slot and the callback closure can read the reaped status.
struct ChildWatchFuncsWrapper(std::sync::Arc<ChildWatchFuncs>);

impl SourceFuncs for ChildWatchFuncsWrapper {
    fn prepare(&self, source: &Source) -> (bool, Option<Duration>) {
        self.0.prepare(source)
    }

    fn check(&self, source: &Source) -> bool {
        self.0.check(source)
    }

    fn dispatch(&self, source: &Source) -> Continue {
        self.0.dispatch(source)
    }

    fn finalize(&self, source: &Source) {
        self.0.finalize(source)
    }
}

pub fn child_watch_add<F>(context: &MainContext, pid: libc::pid_t, callback: F) -> std::io::Result<SourceId>
where
    F: FnOnce(ChildStatus) + Send + 'static,
{
    child_watch_add_full(context, crate::source::PRIORITY_DEFAULT, pid, callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn watches_a_child_to_completion() {
        let ctx = MainContext::new();
        let child = unsafe { libc::fork() };
        if child == 0 {
            unsafe { libc::_exit(7) };
        }
        assert!(child > 0);

        let seen = Arc::new(AtomicBool::new(false));
        let seen2 = Arc::clone(&seen);
        let code = Arc::new(AtomicI32::new(-1));
        let code2 = Arc::clone(&code);
        child_watch_add(&ctx, child, move |status| {
            seen2.store(true, Ordering::SeqCst);
            code2.store(status.exit_code().unwrap_or(-1), Ordering::SeqCst);
        })
        .unwrap();

        let mut dispatched = false;
        for _ in 0..200 {
            if ctx.iteration(false) {
                dispatched = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(dispatched);
        assert!(seen.load(Ordering::SeqCst));
        assert_eq!(code.load(Ordering::SeqCst), 7);
    }
}
