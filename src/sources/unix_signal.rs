//! A source that dispatches when a Unix signal is delivered to the process.
//!
//! Only available on Unix. The handler installed for `signum` is the
//! minimal async-signal-safe stub in [`crate::sys::unix_signal`]: it sets a
//! flag and wakes the worker context, nothing else. All real work — running
//! the user's callback — happens later, from ordinary code on the context
//! that owns this source.

#![cfg(unix)]

use std::os::raw::c_int;
use std::time::Duration;

use crate::context::MainContext;
use crate::source::{Callback, Continue, Priority, Source, SourceFuncs, SourceId};
use crate::sys::unix_signal;

struct UnixSignalFuncs {
    signum: c_int,
}

impl SourceFuncs for UnixSignalFuncs {
    fn prepare(&self, _source: &Source) -> (bool, Option<Duration>) {
        (unix_signal::take_pending(self.signum), None)
    }

    fn check(&self, _source: &Source) -> bool {
        unix_signal::take_pending(self.signum)
    }

    fn dispatch(&self, source: &Source) -> Continue {
        source.invoke_callback()
    }

    fn finalize(&self, _source: &Source) {
        unix_signal::uninstall(self.signum);
    }
}

/// Attaches a source that runs `callback` each time `signum` is delivered to
/// the process, at `priority`. The source removes itself the first time
/// `callback` returns `false`.
///
/// Delivery while no context is iterating is not lost — `signum`'s pending
/// flag is sticky until consumed — but multiple deliveries before the next
/// iteration coalesce into a single callback invocation, matching normal
/// Unix signal semantics (no queueing).
pub fn unix_signal_add_full<F>(context: &MainContext, priority: Priority, signum: c_int, mut callback: F) -> std::io::Result<SourceId>
where
    F: FnMut() -> Continue + Send + 'static,
{
    unix_signal::install(signum)?;
    let source = Source::new(UnixSignalFuncs { signum });
    source.set_priority(priority);
    source.set_callback(Callback::new(move |_src| callback()));
    Ok(context.attach(source))
}

pub fn unix_signal_add<F>(context: &MainContext, signum: c_int, callback: F) -> std::io::Result<SourceId>
where
    F: FnMut() -> Continue + Send + 'static,
{
    unix_signal_add_full(context, crate::source::PRIORITY_DEFAULT, signum, callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn delivered_signal_dispatches_once() {
        let ctx = MainContext::new();
        let fired = Arc::new(AtomicBool::new(false));
        let f2 = Arc::clone(&fired);
        unix_signal_add(&ctx, libc::SIGUSR1, move || {
            f2.store(true, Ordering::SeqCst);
            false
        })
        .unwrap();

        unsafe {
            libc::raise(libc::SIGUSR1);
        }
        std::thread::sleep(Duration::from_millis(20));

        let mut dispatched = false;
        for _ in 0..20 {
            if ctx.iteration(false) {
                dispatched = true;
                break;
            }
        }
        assert!(dispatched);
        assert!(fired.load(Ordering::SeqCst));
    }
}
