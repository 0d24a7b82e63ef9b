//! [`AsyncQueue`]: a thread-safe, optionally-sorted blocking message queue.
//!
//! Modeled on GLib's `GAsyncQueue`: a `VecDeque` protected by a mutex and
//! condition variable, with waiters counted so `length()` can report the
//! queue's *logical* size (items waiting minus threads already waiting to
//! receive one) the way the original does.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::sync::{Cond, Mutex, MutexGuard};

struct Inner<T> {
    items: VecDeque<T>,
    waiting: i32,
}

/// A blocking FIFO (or, with [`AsyncQueue::push_sorted`], priority) queue
/// shared between threads via `Clone`.
pub struct AsyncQueue<T> {
    inner: std::sync::Arc<QueueState<T>>,
}

struct QueueState<T> {
    mutex: Mutex<Inner<T>>,
    cond: Cond,
}

/// A held lock on an [`AsyncQueue`]'s internal state, returned by
/// [`AsyncQueue::lock`].
///
/// While held, the `_unlocked` methods below read and mutate the queue
/// directly, without re-acquiring the mutex — this is how multi-step atomic
/// sequences (check-then-push, drain-N-items) are expressed without a
/// dedicated method for every combination. Dropping the guard releases the
/// lock; [`AsyncQueueGuard::unlock`] does the same, named to match
/// `g_async_queue_unlock`.
pub struct AsyncQueueGuard<'a, T> {
    inner: MutexGuard<'a, Inner<T>>,
    cond: &'a Cond,
}

impl<'a, T> AsyncQueueGuard<'a, T> {
    /// Releases the lock. Equivalent to letting the guard drop.
    pub fn unlock(self) {}

    pub fn push_unlocked(&mut self, item: T) {
        self.inner.items.push_back(item);
        self.cond.signal();
    }

    pub fn push_front_unlocked(&mut self, item: T) {
        self.inner.items.push_front(item);
        self.cond.signal();
    }

    pub fn push_sorted_unlocked<F>(&mut self, item: T, mut compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        let pos = self
            .inner
            .items
            .iter()
            .position(|existing| compare(&item, existing) == std::cmp::Ordering::Less)
            .unwrap_or(self.inner.items.len());
        self.inner.items.insert(pos, item);
        self.cond.signal();
    }

    /// Blocks until an item is available, then removes and returns it.
    pub fn pop_unlocked(&mut self) -> T {
        self.inner.waiting += 1;
        loop {
            if let Some(item) = self.inner.items.pop_front() {
                self.inner.waiting -= 1;
                return item;
            }
            self.cond.wait(&mut self.inner);
        }
    }

    pub fn try_pop_unlocked(&mut self) -> Option<T> {
        self.inner.items.pop_front()
    }

    pub fn timeout_pop_unlocked(&mut self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        self.inner.waiting += 1;
        let result = loop {
            if let Some(item) = self.inner.items.pop_front() {
                break Some(item);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break None;
            }
            if !self.cond.wait_for(&mut self.inner, remaining) {
                break self.inner.items.pop_front();
            }
        };
        self.inner.waiting -= 1;
        result
    }

    pub fn remove_unlocked<F>(&mut self, mut predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        if let Some(pos) = self.inner.items.iter().position(|item| predicate(item)) {
            self.inner.items.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn length_unlocked(&self) -> i32 {
        self.inner.items.len() as i32 - self.inner.waiting
    }

    pub fn sort_unlocked<F>(&mut self, mut compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        let mut items: Vec<T> = self.inner.items.drain(..).collect();
        items.sort_by(&mut compare);
        self.inner.items.extend(items);
    }

    pub fn foreach_unlocked<F>(&self, mut f: F)
    where
        F: FnMut(&T),
    {
        for item in self.inner.items.iter() {
            f(item);
        }
    }
}

impl<T> Clone for AsyncQueue<T> {
    fn clone(&self) -> AsyncQueue<T> {
        AsyncQueue {
            inner: std::sync::Arc::clone(&self.inner),
        }
    }
}

impl<T> AsyncQueue<T> {
    pub fn new() -> AsyncQueue<T> {
        AsyncQueue {
            inner: std::sync::Arc::new(QueueState {
                mutex: Mutex::new(Inner {
                    items: VecDeque::new(),
                    waiting: 0,
                }),
                cond: Cond::new(),
            }),
        }
    }

    /// Locks the queue's internal mutex, returning a guard through which the
    /// `_unlocked` method family composes multiple operations into one
    /// atomic sequence. Mirrors `g_async_queue_lock`; every method below is
    /// implemented in terms of a single-operation `lock()` call.
    pub fn lock(&self) -> AsyncQueueGuard<'_, T> {
        AsyncQueueGuard {
            inner: self.inner.mutex.lock(),
            cond: &self.inner.cond,
        }
    }

    /// Appends `item` at the tail (the next item `pop` would return is the
    /// head).
    pub fn push(&self, item: T) {
        self.lock().push_unlocked(item);
    }

    /// Prepends `item`, jumping the normal FIFO order — the one-off
    /// "handle this next" escape hatch.
    pub fn push_front(&self, item: T) {
        self.lock().push_front_unlocked(item);
    }

    /// Inserts `item` keeping the queue ordered by `compare`, where
    /// `compare(a, b)` returns the ordering of `a` relative to `b`.
    ///
    /// `pop` always takes from the front, so the front holds the least
    /// element under `compare`: ties keep FIFO order among themselves, since
    /// `item` is inserted just before the first existing element it compares
    /// less than.
    pub fn push_sorted<F>(&self, item: T, compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.lock().push_sorted_unlocked(item, compare);
    }

    /// Blocks until an item is available, then removes and returns it.
    pub fn pop(&self) -> T {
        self.lock().pop_unlocked()
    }

    /// Removes and returns an item if one is immediately available.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().try_pop_unlocked()
    }

    /// Like `pop`, but gives up and returns `None` after `timeout`.
    pub fn timeout_pop(&self, timeout: Duration) -> Option<T> {
        self.lock().timeout_pop_unlocked(timeout)
    }

    /// Removes the first item for which `predicate` returns `true`.
    /// Returns whether an item was removed.
    pub fn remove<F>(&self, predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        self.lock().remove_unlocked(predicate)
    }

    /// The queue's logical length: items currently queued minus threads
    /// already blocked in `pop`/`timeout_pop` (a negative value means more
    /// waiters than items, as GLib's `g_async_queue_length` documents).
    pub fn length(&self) -> i32 {
        self.lock().length_unlocked()
    }

    /// Re-sorts the whole queue in place by `compare`, least element first.
    pub fn sort<F>(&self, compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.lock().sort_unlocked(compare);
    }

    /// Runs `f` over every queued item in FIFO order without removing any
    /// of them, while holding the queue locked.
    pub fn foreach<F>(&self, f: F)
    where
        F: FnMut(&T),
    {
        self.lock().foreach_unlocked(f);
    }
}

impl<T> Default for AsyncQueue<T> {
    fn default() -> AsyncQueue<T> {
        AsyncQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order_preserved() {
        let q = AsyncQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.pop(), 1);
        assert_eq!(q.pop(), 2);
        assert_eq!(q.pop(), 3);
    }

    #[test]
    fn push_front_jumps_the_line() {
        let q = AsyncQueue::new();
        q.push(1);
        q.push_front(0);
        assert_eq!(q.pop(), 0);
        assert_eq!(q.pop(), 1);
    }

    #[test]
    fn push_sorted_keeps_ascending_order() {
        let q = AsyncQueue::new();
        q.push_sorted(3, |a, b| a.cmp(b));
        q.push_sorted(1, |a, b| a.cmp(b));
        q.push_sorted(2, |a, b| a.cmp(b));
        assert_eq!(q.pop(), 1);
        assert_eq!(q.pop(), 2);
        assert_eq!(q.pop(), 3);
    }

    #[test]
    fn timeout_pop_gives_up() {
        let q: AsyncQueue<i32> = AsyncQueue::new();
        assert_eq!(q.timeout_pop(Duration::from_millis(20)), None);
    }

    #[test]
    fn length_accounts_for_waiters() {
        let q: Arc<AsyncQueue<i32>> = Arc::new(AsyncQueue::new());
        assert_eq!(q.length(), 0);
        let q2 = Arc::clone(&q);
        let waiter_started = Arc::new(AtomicUsize::new(0));
        let ws2 = Arc::clone(&waiter_started);
        let handle = thread::spawn(move || {
            ws2.fetch_add(1, Ordering::SeqCst);
            q2.pop()
        });
        while waiter_started.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(20));
        assert!(q.length() <= 0);
        q.push(7);
        assert_eq!(handle.join().unwrap(), 7);
    }

    #[test]
    fn cross_thread_handoff() {
        let q = AsyncQueue::new();
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.pop());
        thread::sleep(Duration::from_millis(10));
        q.push(42);
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn locked_composes_check_then_push_atomically() {
        let q: AsyncQueue<i32> = AsyncQueue::new();
        q.push(1);
        q.push(2);

        let mut guard = q.lock();
        if guard.length_unlocked() == 2 {
            guard.push_unlocked(3);
        }
        guard.unlock();

        assert_eq!(q.pop(), 1);
        assert_eq!(q.pop(), 2);
        assert_eq!(q.pop(), 3);
    }

    #[test]
    fn unlocked_variants_match_locking_ones() {
        let q: AsyncQueue<i32> = AsyncQueue::new();
        {
            let mut guard = q.lock();
            guard.push_unlocked(1);
            guard.push_front_unlocked(0);
            guard.push_sorted_unlocked(5, |a, b| a.cmp(b));
        }
        assert_eq!(q.length(), 3);
        assert_eq!(q.pop(), 0);
        assert_eq!(q.pop(), 1);
        assert_eq!(q.pop(), 5);
        assert_eq!(q.try_pop(), None);
    }
}
