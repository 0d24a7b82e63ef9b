//! A condition variable for use alongside [`Mutex`](super::Mutex).

use std::time::Duration;

use parking_lot::WaitTimeoutResult;

use super::MutexGuard;

/// Wraps a waiter thread up in a condition variable; `wait`/`wait_for` must
/// be called with a guard from the *same* mutex that protects the awaited
/// condition.
#[derive(Default)]
pub struct Cond {
    inner: parking_lot::Condvar,
}

impl Cond {
    pub const fn new() -> Cond {
        Cond {
            inner: parking_lot::Condvar::new(),
        }
    }

    pub fn wait<'a, T>(&self, guard: &mut MutexGuard<'a, T>) {
        self.inner.wait(guard);
    }

    /// Waits at most `timeout`. Returns `true` if woken by a signal before
    /// the timeout elapsed, `false` if the timeout expired first.
    pub fn wait_for<'a, T>(&self, guard: &mut MutexGuard<'a, T>, timeout: Duration) -> bool {
        let result: WaitTimeoutResult = self.inner.wait_for(guard, timeout);
        !result.timed_out()
    }

    pub fn signal(&self) {
        self.inner.notify_one();
    }

    pub fn broadcast(&self) {
        self.inner.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::Mutex;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn signal_wakes_a_waiter() {
        let mutex = Arc::new(Mutex::new(false));
        let cond = Arc::new(Cond::new());

        let (m2, c2) = (Arc::clone(&mutex), Arc::clone(&cond));
        let handle = thread::spawn(move || {
            let mut guard = m2.lock();
            while !*guard {
                c2.wait(&mut guard);
            }
        });

        thread::sleep(Duration::from_millis(10));
        *mutex.lock() = true;
        cond.signal();
        handle.join().unwrap();
    }

    #[test]
    fn wait_for_times_out() {
        let mutex = Mutex::new(());
        let cond = Cond::new();
        let mut guard = mutex.lock();
        let signaled = cond.wait_for(&mut guard, Duration::from_millis(10));
        assert!(!signaled);
    }
}
