//! [`Source`]: the polymorphic event record.
//!
//! A source is created detached, adopts exactly one context on
//! [`MainContext::attach`](crate::context::MainContext::attach), and carries
//! its own `prepare`/`check`/`dispatch`/`finalize` behavior through the
//! [`SourceFuncs`] trait object — the idiomatic replacement for a
//! duck-typed callback-funcs vtable.
//!
//! Ownership is expressed with `Arc`/`Weak` rather than an intrusive
//! doubly-linked list with parent back-pointers: a context's source-lists
//! and a parent's child list hold strong (`Arc`) references; a source's
//! back-reference to its parent and to its owning context are `Weak`.
//! GLib's "dispose can resurrect at refcount 0" pattern has no equivalent
//! once ownership is `Arc`-based — this is the one place where the
//! behavior is deliberately narrowed: `dispose` here cannot bring a source
//! back to life, it only gets a last look before `finalize` runs.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::context::ContextInner;
use crate::poll_fn::IoCondition;
use crate::sync::Mutex;

/// Lower is higher priority; the full signed range is legal.
pub type Priority = i32;

pub const PRIORITY_HIGH: Priority = -100;
pub const PRIORITY_DEFAULT: Priority = 0;
pub const PRIORITY_HIGH_IDLE: Priority = 100;
pub const PRIORITY_DEFAULT_IDLE: Priority = 200;
pub const PRIORITY_LOW: Priority = 300;

/// A source's id within its owning context. `0` means "never attached".
pub type SourceId = u64;

/// Returned by a callback or by `SourceFuncs::dispatch` to say whether the
/// source should remain attached (`true`) or be destroyed (`false`).
pub type Continue = bool;

/// Absolute monotonic-microseconds deadline, or "never" (`-1`) / "now" (`0`).
pub const READY_TIME_NEVER: i64 = -1;

/// A tag identifying one fd registration with a source, returned by
/// `add_unix_fd`/`add_poll` and required by the `modify`/`remove` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollTag(pub(crate) u64);

/// The per-source behavior a concrete source type supplies.
///
/// `prepare`/`check` run with the context lock *not* held, but with the
/// context's in-iteration flag set; they must not call back into
/// `MainContext` operations on the same context — the context diagnoses
/// and refuses such reentrancy rather than deadlocking.
pub trait SourceFuncs: Send + Sync {
    /// Returns `(ready, timeout_hint)`. Absence of a real need to prepare is
    /// expressed by always returning `(false, None)` — the default.
    fn prepare(&self, _source: &Source) -> (bool, Option<std::time::Duration>) {
        (false, None)
    }

    /// Returns whether the source is ready, consulted after `poll`.
    fn check(&self, _source: &Source) -> bool {
        false
    }

    /// Invokes the source's behavior for one dispatch turn. Implementations
    /// that have a user callback pull it via `source.take_callback()` /
    /// `source.put_callback_back()` or `source.with_callback(..)`.
    fn dispatch(&self, source: &Source) -> Continue;

    /// Runs once, at refcount zero, before `finalize`. May not resurrect the
    /// source (see module docs).
    fn dispose(&self, _source: &Source) {}

    /// Runs once, at refcount zero, after `dispose`. Must not depend on the
    /// owning context — it may already be gone.
    fn finalize(&self, _source: &Source) {}
}

/// The unified replacement for GLib's plain-function-or-bound-closure
/// callback duck typing: in Rust a boxed `FnMut` already owns whatever
/// data it closes over, so there is only one shape.
pub struct Callback {
    pub(crate) func: Box<dyn FnMut(&Source) -> Continue + Send>,
    pub(crate) destroy: Option<Box<dyn FnOnce() + Send>>,
}

impl Callback {
    pub fn new<F>(func: F) -> Callback
    where
        F: FnMut(&Source) -> Continue + Send + 'static,
    {
        Callback {
            func: Box::new(func),
            destroy: None,
        }
    }

    pub fn with_destroy_notify<F, D>(func: F, destroy: D) -> Callback
    where
        F: FnMut(&Source) -> Continue + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        Callback {
            func: Box::new(func),
            destroy: Some(Box::new(destroy)),
        }
    }
}

impl Drop for Callback {
    fn drop(&mut self) {
        if let Some(destroy) = self.destroy.take() {
            destroy();
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PollRecord {
    pub tag: PollTag,
    pub fd: crate::poll_fn::RawFd,
    pub events: IoCondition,
    pub revents: IoCondition,
    pub priority: Priority,
}

pub(crate) struct SourceState {
    pub context: Option<Weak<ContextInner>>,
    pub active: bool,
    pub destroyed: bool,
    pub can_recurse: bool,
    pub in_call: bool,
    pub ready: bool,
    pub blocked: bool,
    pub poll_fds: Vec<PollRecord>,
    pub parent: Option<Weak<Source>>,
    pub children: Vec<Arc<Source>>,
    pub callback: Option<Callback>,
    pub name: Option<String>,
    pub next_poll_tag: u64,
    pub finalized: bool,
}

/// A polymorphic event-producer record.
///
/// Created unattached via [`Source::new`]; [`MainContext::attach`] adopts
/// exactly one reference and registers it with a context. Destroying a
/// source (`destroy`) marks it inactive and detaches it without freeing it —
/// that follows the final `Arc` drop, which runs `dispose` then `finalize`.
pub struct Source {
    pub(crate) id: AtomicU64,
    pub(crate) priority: AtomicI32,
    pub(crate) ready_time: AtomicI64,
    pub(crate) funcs: Box<dyn SourceFuncs>,
    pub(crate) state: Mutex<SourceState>,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.id.load(Ordering::Relaxed))
            .field("priority", &self.priority.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Source {
    /// Creates a fresh, unattached source with the given behavior.
    pub fn new(funcs: impl SourceFuncs + 'static) -> Arc<Source> {
        Arc::new(Source {
            id: AtomicU64::new(0),
            priority: AtomicI32::new(PRIORITY_DEFAULT),
            ready_time: AtomicI64::new(READY_TIME_NEVER),
            funcs: Box::new(funcs),
            state: Mutex::new(SourceState {
                context: None,
                active: true,
                destroyed: false,
                can_recurse: false,
                in_call: false,
                ready: false,
                blocked: false,
                poll_fds: Vec::new(),
                parent: None,
                children: Vec::new(),
                callback: None,
                name: None,
                next_poll_tag: 1,
                finalized: false,
            }),
        })
    }

    pub fn id(&self) -> SourceId {
        self.id.load(Ordering::Acquire)
    }

    pub fn priority(&self) -> Priority {
        self.priority.load(Ordering::Acquire)
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    pub fn set_can_recurse(&self, can_recurse: bool) {
        self.state.lock().can_recurse = can_recurse;
    }

    pub fn can_recurse(&self) -> bool {
        self.state.lock().can_recurse
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.state.lock().name = Some(name.into());
    }

    pub fn name(&self) -> Option<String> {
        self.state.lock().name.clone()
    }

    pub fn context(&self) -> Option<Arc<ContextInner>> {
        self.state.lock().context.as_ref().and_then(Weak::upgrade)
    }

    /// `-1` ("never"), `0` ("immediately"), or an absolute monotonic-µs
    /// deadline.
    pub fn ready_time(&self) -> i64 {
        self.ready_time.load(Ordering::Acquire)
    }

    /// Sets the ready-time deadline. If the source is attached and the value
    /// actually changed, wakes its context (the prepare-computed deadline
    /// may no longer be valid) — setting the same value twice is a no-op
    /// wakeup-wise.
    pub fn set_ready_time(self: &Arc<Source>, time: i64) {
        let previous = self.ready_time.swap(time, Ordering::AcqRel);
        if previous == time {
            return;
        }
        if let Some(ctx) = self.context() {
            ctx.wakeup_for_source_change();
        }
    }

    /// Sets the ready-time deadline without waking the context. For use by
    /// a source's own `prepare`/`dispatch`, which already run on the
    /// context's owning thread during an iteration in progress — there is
    /// nothing blocked in `poll` to wake up.
    pub(crate) fn set_ready_time_raw(&self, time: i64) {
        self.ready_time.store(time, Ordering::Release);
    }

    pub fn set_callback(&self, callback: Callback) {
        self.state.lock().callback = Some(callback);
    }

    pub fn clear_callback(&self) {
        self.state.lock().callback = None;
    }

    /// Invokes the currently-registered callback, if any, with `self` as the
    /// argument. Returns `true` (keep) when there is no callback, matching
    /// GLib's "callback may be null" dispatch contract.
    pub(crate) fn invoke_callback(&self) -> Continue {
        let mut cb = self.state.lock().callback.take();
        let keep = match cb.as_mut() {
            Some(callback) => (callback.func)(self),
            None => true,
        };
        self.state.lock().callback = cb;
        keep
    }

    /// Registers an fd for polling. Returns an opaque tag identifying the
    /// record for later `remove_poll`/`modify_unix_fd` calls.
    pub fn add_poll(self: &Arc<Source>, fd: crate::poll_fn::RawFd, events: IoCondition) -> PollTag {
        let priority = self.priority();
        let mut state = self.state.lock();
        let tag = PollTag(state.next_poll_tag);
        state.next_poll_tag += 1;
        state.poll_fds.push(PollRecord {
            tag,
            fd,
            events,
            revents: IoCondition::empty(),
            priority,
        });
        let context = state.context.clone();
        drop(state);
        if let Some(ctx) = context.and_then(|c| c.upgrade()) {
            ctx.add_poll_record(self, tag, fd, events, priority);
        }
        tag
    }

    pub fn remove_poll(self: &Arc<Source>, tag: PollTag) {
        let context = {
            let mut state = self.state.lock();
            state.poll_fds.retain(|r| r.tag != tag);
            state.context.clone()
        };
        if let Some(ctx) = context.and_then(|c| c.upgrade()) {
            ctx.remove_poll_record(tag);
        }
    }

    /// Alias for `add_poll` under the name the unix-fd family of operations
    /// uses.
    pub fn add_unix_fd(self: &Arc<Source>, fd: crate::poll_fn::RawFd, events: IoCondition) -> PollTag {
        self.add_poll(fd, events)
    }

    pub fn modify_unix_fd(self: &Arc<Source>, tag: PollTag, events: IoCondition) {
        let context = {
            let mut state = self.state.lock();
            if let Some(record) = state.poll_fds.iter_mut().find(|r| r.tag == tag) {
                record.events = events;
            }
            state.context.clone()
        };
        if let Some(ctx) = context.and_then(|c| c.upgrade()) {
            ctx.modify_poll_record(tag, events);
        }
    }

    pub fn remove_unix_fd(self: &Arc<Source>, tag: PollTag) {
        self.remove_poll(tag);
    }

    /// The condition observed on `tag` during the most recent `check`.
    pub fn query_unix_fd(&self, tag: PollTag) -> IoCondition {
        self.state
            .lock()
            .poll_fds
            .iter()
            .find(|r| r.tag == tag)
            .map(|r| r.revents)
            .unwrap_or_else(IoCondition::empty)
    }

    /// Destroys the source: idempotent, callable from any thread. Clears the
    /// active flag, detaches poll-fds, unparents (and recursively destroys)
    /// children, and releases the callback. Does not free the source — that
    /// follows the final `Arc` drop.
    pub fn destroy(self: &Arc<Source>) {
        let (context, children, tags) = {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.active = false;
            let tags: Vec<PollTag> = state.poll_fds.iter().map(|r| r.tag).collect();
            state.poll_fds.clear();
            let children = std::mem::take(&mut state.children);
            state.callback = None;
            (state.context.clone(), children, tags)
        };

        for child in &children {
            child.state.lock().parent = None;
            child.destroy();
        }

        if let Some(ctx) = context.as_ref().and_then(Weak::upgrade) {
            for tag in tags {
                ctx.remove_poll_record(tag);
            }
            ctx.detach_source(self);
        }
    }

    pub fn set_priority(self: &Arc<Source>, priority: Priority) {
        let (is_child, context) = {
            let state = self.state.lock();
            (state.parent.is_some(), state.context.clone())
        };
        if is_child {
            // A child's priority may only change through its parent.
            return;
        }
        if let Some(ctx) = context.and_then(|c| c.upgrade()) {
            ctx.reprioritize_source(self, priority);
        } else {
            self.priority.store(priority, Ordering::Release);
        }
    }

    pub(crate) fn set_priority_raw(&self, priority: Priority) {
        self.priority.store(priority, Ordering::Release);
    }

    /// Attaches `child` to `self`. `child` must be unattached, unparented
    /// and not destroyed; it inherits `self`'s priority and, while `self`
    /// is blocked, is blocked too.
    pub fn add_child_source(self: &Arc<Source>, child: &Arc<Source>) {
        {
            let child_state = child.state.lock();
            assert!(child_state.context.is_none(), "child source already attached");
            assert!(child_state.parent.is_none(), "child source already parented");
            assert!(!child_state.destroyed, "child source already destroyed");
        }
        child.priority.store(self.priority(), Ordering::Release);
        let (context, blocked) = {
            let mut state = self.state.lock();
            state.children.push(Arc::clone(child));
            (state.context.clone(), state.blocked)
        };
        child.state.lock().parent = Some(Arc::downgrade(self));
        child.state.lock().blocked = blocked;

        if let Some(ctx) = context.and_then(|c| c.upgrade()) {
            ctx.attach_child(self, child);
        }
    }

    pub fn remove_child_source(self: &Arc<Source>, child: &Arc<Source>) {
        let mut state = self.state.lock();
        state.children.retain(|c| !Arc::ptr_eq(c, child));
        drop(state);
        child.state.lock().parent = None;
    }

    pub(crate) fn propagate_ready_to_parents(&self) {
        let parent = self.state.lock().parent.clone();
        if let Some(parent) = parent.and_then(|p| p.upgrade()) {
            parent.state.lock().ready = true;
            parent.propagate_ready_to_parents();
        }
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.finalized {
            return;
        }
        state.finalized = true;
        drop(state);
        self.funcs.dispose(self_ref_placeholder(self));
        self.funcs.finalize(self_ref_placeholder(self));
    }
}

/// `SourceFuncs::dispose`/`finalize` take `&Source`, not `&Arc<Source>`, so
/// they remain callable from `Drop` (where no `Arc` exists anymore).
fn self_ref_placeholder(source: &Source) -> &Source {
    source
}
