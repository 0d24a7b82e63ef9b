//! A thin wrapper over native OS threads: creation, naming, joining.
//!
//! Unlike [`std::thread`], `create` surfaces a typed [`Error`] rather than
//! panicking when the OS refuses to spin up a new thread (`EAGAIN` under
//! thread-count or memory pressure is a routine, recoverable condition for a
//! long-running service, not a programming error).

use std::thread::JoinHandle;

use crate::error::{Error, Result};

/// A joinable OS thread created through [`Thread::create`].
pub struct Thread<T> {
    name: String,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> Thread<T> {
    /// Spawns `body` on a new thread named `name`. Unlike
    /// [`std::thread::spawn`], failure to create the underlying OS thread is
    /// returned as [`Error::ResourceExhausted`] instead of panicking.
    pub fn create<F>(name: impl Into<String>, body: F) -> Result<Thread<T>>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let name = name.into();
        let scheduler_snapshot = capture_scheduler();
        let spawn_name = name.clone();
        let builder = std::thread::Builder::new().name(name.clone());
        let handle = builder
            .spawn(move || {
                apply_thread_identity(&spawn_name, &scheduler_snapshot);
                body()
            })
            .map_err(Error::ResourceExhausted)?;
        Ok(Thread { name, handle })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until the thread terminates, returning its result. Only an
    /// unwinding panic inside `body` turns this into an error.
    pub fn join(self) -> std::thread::Result<T> {
        self.handle.join()
    }
}

#[cfg(unix)]
type SchedSnapshot = Option<crate::sys::unix_thread::SchedAttr>;
#[cfg(not(unix))]
type SchedSnapshot = ();

#[cfg(unix)]
fn capture_scheduler() -> SchedSnapshot {
    crate::sys::unix_thread::capture()
}
#[cfg(not(unix))]
fn capture_scheduler() -> SchedSnapshot {}

#[cfg(unix)]
fn apply_thread_identity(name: &str, scheduler: &SchedSnapshot) {
    let native = unsafe { libc::pthread_self() };
    crate::sys::unix_thread::set_name(native, name);
    if let Some(attr) = scheduler {
        crate::sys::unix_thread::apply(attr);
    }
}

#[cfg(not(unix))]
fn apply_thread_identity(_name: &str, _scheduler: &SchedSnapshot) {}

/// Yields the remainder of the calling thread's current timeslice.
pub fn yield_now() {
    std::thread::yield_now();
}

/// The calling thread's id, for logging and owner-identity checks.
pub fn current_id() -> std::thread::ThreadId {
    std::thread::current().id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn create_and_join_runs_body() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = Arc::clone(&ran);
        let t = Thread::create("worker-test", move || {
            ran2.store(true, Ordering::SeqCst);
            7
        })
        .unwrap();
        assert_eq!(t.join().unwrap(), 7);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn name_is_preserved() {
        let t = Thread::create("named-thread", || ()).unwrap();
        assert_eq!(t.name(), "named-thread");
        t.join().unwrap();
    }
}
