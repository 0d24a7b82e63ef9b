//! The process-wide worker context: a background thread that keeps a
//! [`MainContext`] iterating forever, used to host watches that need
//! somewhere to run even when the application has no loop of its own —
//! Unix signal and child-process watches in particular.
//!
//! Grounded on GLib's internal `glib_worker_context`: a singleton, lazily
//! started on first use, never torn down for the life of the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::context::MainContext;

struct Worker {
    context: MainContext,
    #[allow(dead_code)]
    thread: crate::thread::Thread<()>,
}

static WORKER: OnceLock<Worker> = OnceLock::new();
static STARTED: AtomicBool = AtomicBool::new(false);

fn worker() -> &'static Worker {
    WORKER.get_or_init(|| {
        let context = MainContext::new();
        let run_context = context.clone();
        #[cfg(unix)]
        crate::sys::unix_signal::set_wake_fd(context.wakeup_raw_fd());
        STARTED.store(true, Ordering::Release);
        let thread = crate::thread::Thread::create("evloop-worker", move || loop {
            run_context.iteration(true);
        })
        .expect("worker thread creation must not fail");
        log::debug!("worker context started");
        Worker { context, thread }
    })
}

/// Returns the process-wide worker [`MainContext`], starting its background
/// thread on first call. The thread runs `iteration(true)` in a tight loop
/// for the remaining lifetime of the process.
pub fn worker_context() -> MainContext {
    worker().context.clone()
}

/// Whether the worker thread has been started yet. Mainly useful for tests
/// that want to assert they did (or didn't) trigger lazy startup.
pub fn is_started() -> bool {
    STARTED.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_context_is_a_singleton() {
        let a = worker_context();
        let b = worker_context();
        assert!(std::sync::Arc::ptr_eq(&a.inner, &b.inner));
    }
}
