//! One-time initialization of a lazily-computed value.
//!
//! GLib's `g_once_init_enter`/`g_once_init_leave` pair lets a caller run
//! arbitrary multi-statement setup exactly once and publish the result with
//! a single atomic write; `std::sync::OnceLock` already gives the same
//! guarantee behind a narrower, closure-based API, so `Once` is a thin
//! rename rather than a hand-rolled reimplementation.
pub struct Once<T> {
    inner: std::sync::OnceLock<T>,
}

impl<T> Once<T> {
    pub const fn new() -> Once<T> {
        Once {
            inner: std::sync::OnceLock::new(),
        }
    }

    /// Returns the value, computing it with `init` on exactly one caller if
    /// it hasn't been computed yet; every other concurrent caller blocks
    /// until that computation finishes and then observes the same value.
    pub fn call_once(&self, init: impl FnOnce() -> T) -> &T {
        self.inner.get_or_init(init)
    }

    pub fn get(&self) -> Option<&T> {
        self.inner.get()
    }
}

impl<T> Default for Once<T> {
    fn default() -> Once<T> {
        Once::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn init_runs_exactly_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let once: Once<u32> = Once::new();
        let a = *once.call_once(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            42
        });
        let b = *once.call_once(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            99
        });
        assert_eq!(a, 42);
        assert_eq!(b, 42);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
