//! [`MainContext`]: the prepare → query → poll → check → dispatch engine.
//!
//! A context owns a set of attached [`Source`]s, a sorted fd-registration
//! table, and a single-owner-at-a-time arbitration scheme built on an
//! acquire/release/wait trio: exactly one thread may be running an
//! iteration of a given context at a time, but any thread may ask to become
//! the owner, and any thread may push the context as its thread-default to
//! have implicitly-context-bound sources attach to it.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::ThreadId;
use std::time::Duration;

use crate::poll_fn::{DefaultPollFn, IoCondition, PollFd, PollFn};
use crate::source::{Priority, Source, SourceId};
use crate::sync::{Cond, Mutex};
use crate::wakeup::Wakeup;

thread_local! {
    static THREAD_DEFAULT_STACK: std::cell::RefCell<Vec<MainContext>> =
        const { std::cell::RefCell::new(Vec::new()) };
}

static GLOBAL_DEFAULT: OnceLock<MainContext> = OnceLock::new();

fn poll_debug_enabled() -> bool {
    static FLAG: OnceLock<bool> = OnceLock::new();
    *FLAG.get_or_init(|| std::env::var_os("EVLOOP_POLL_DEBUG").is_some())
}

struct FullRegistration {
    fd: crate::poll_fn::RawFd,
    events: IoCondition,
    owner: Weak<Source>,
}

pub(crate) struct ContextState {
    sources_by_priority: BTreeMap<Priority, Vec<Arc<Source>>>,
    sources_by_id: HashMap<SourceId, Arc<Source>>,
    registrations: HashMap<crate::source::PollTag, FullRegistration>,
    owner: Option<ThreadId>,
    owner_count: u32,
    waiting_threads: u32,
}

/// The shared, `Arc`-held internals behind a [`MainContext`] handle.
pub struct ContextInner {
    poll_fn: Box<dyn PollFn>,
    wakeup: Wakeup,
    wakeup_tag: crate::source::PollTag,
    state: Mutex<ContextState>,
    owner_cond: Cond,
    next_source_id: AtomicU64,
    in_iteration: AtomicBool,
    self_weak: Weak<ContextInner>,
}

/// A prepare/query/poll/check/dispatch cycle's engine and source registry.
///
/// Cheaply cloneable: clones share the same underlying [`ContextInner`] via
/// `Arc`, matching the original's refcounted context handle.
#[derive(Clone)]
pub struct MainContext {
    pub(crate) inner: Arc<ContextInner>,
}

impl MainContext {
    /// Creates a context backed by the platform's native poll function.
    pub fn new() -> MainContext {
        MainContext::new_with_poll_fn(Box::new(DefaultPollFn))
    }

    /// Creates a context backed by a caller-supplied multiplexor, for
    /// testing or for integrating a foreign event loop.
    pub fn new_with_poll_fn(poll_fn: Box<dyn PollFn>) -> MainContext {
        let wakeup = Wakeup::new().expect("failed to create context wakeup");
        let inner = Arc::new_cyclic(|self_weak| ContextInner {
            poll_fn,
            wakeup,
            wakeup_tag: crate::source::PollTag(0),
            state: Mutex::new(ContextState {
                sources_by_priority: BTreeMap::new(),
                sources_by_id: HashMap::new(),
                registrations: HashMap::new(),
                owner: None,
                owner_count: 0,
                waiting_threads: 0,
            }),
            owner_cond: Cond::new(),
            next_source_id: AtomicU64::new(1),
            in_iteration: AtomicBool::new(false),
            self_weak: self_weak.clone(),
        });
        MainContext { inner }
    }

    /// The process-wide default context, created lazily on first use.
    pub fn default() -> MainContext {
        GLOBAL_DEFAULT.get_or_init(MainContext::new).clone()
    }

    /// Pushes `self` as the calling thread's default context. Sources
    /// attached without an explicit context adopt the top of this stack.
    pub fn push_thread_default(&self) {
        THREAD_DEFAULT_STACK.with(|stack| stack.borrow_mut().push(self.clone()));
    }

    pub fn pop_thread_default(&self) {
        THREAD_DEFAULT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|c| Arc::ptr_eq(&c.inner, &self.inner)) {
                stack.remove(pos);
            }
        });
    }

    /// The calling thread's current thread-default context, if any.
    pub fn thread_default() -> Option<MainContext> {
        THREAD_DEFAULT_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Attaches `source` to this context, assigning it an id. Panics (in
    /// debug terms, a diagnostic in the original) if the source is already
    /// attached elsewhere.
    pub fn attach(&self, source: Arc<Source>) -> SourceId {
        {
            let existing = source.context();
            assert!(existing.is_none(), "source is already attached to a context");
        }

        let id = self.inner.next_source_id.fetch_add(1, Ordering::Relaxed);
        source.id.store(id, Ordering::Release);

        let priority = source.priority();
        let (poll_records, children): (Vec<_>, Vec<_>) = {
            let mut st = source.state.lock();
            st.context = Some(self.inner.self_weak.clone());
            (st.poll_fds.clone(), st.children.clone())
        };

        {
            let mut state = self.inner.state.lock();
            state.sources_by_priority.entry(priority).or_default().push(Arc::clone(&source));
            state.sources_by_id.insert(id, Arc::clone(&source));
        }

        for record in poll_records {
            self.inner.register_fd(record.tag, Arc::clone(&source), record.fd, record.events);
        }
        for child in &children {
            self.inner.attach_child(&source, child);
        }

        self.wakeup_for_source_change();
        id
    }

    pub fn find_source_by_id(&self, id: SourceId) -> Option<Arc<Source>> {
        self.inner.state.lock().sources_by_id.get(&id).cloned()
    }

    /// Forces a blocked `poll` on this context to return so a changed
    /// deadline or fd set is picked up on the next pass.
    pub(crate) fn wakeup_for_source_change(&self) {
        self.inner.wakeup_for_source_change();
    }

    /// The raw fd backing this context's wakeup token, for wiring up
    /// async-signal-safe handlers that need to poke a blocked `poll`
    /// directly (see `sys::unix_signal::set_wake_fd`).
    #[cfg(unix)]
    pub(crate) fn wakeup_raw_fd(&self) -> crate::poll_fn::RawFd {
        self.inner.wakeup.poll_fd().fd
    }

    /// Non-blocking check for whether an iteration would do any work.
    pub fn pending(&self) -> bool {
        self.run_cycle(false, true).dispatched_or_would_dispatch
    }

    /// Runs one prepare/query/poll/check/dispatch cycle. `may_block` governs
    /// whether `poll` is allowed to wait when nothing is immediately ready.
    /// Returns whether any source was dispatched.
    pub fn iteration(&self, may_block: bool) -> bool {
        self.run_cycle(may_block, false).dispatched
    }

    /// Tries to become this context's owner without blocking. On success the
    /// caller must eventually call [`MainContext::release`].
    pub fn acquire(&self) -> bool {
        let current = std::thread::current().id();
        let mut state = self.inner.state.lock();
        match state.owner {
            None => {
                state.owner = Some(current);
                state.owner_count = 1;
                true
            }
            Some(owner) if owner == current => {
                state.owner_count += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Blocks until `acquire` would succeed, then acquires.
    pub fn acquire_blocking(&self) {
        let current = std::thread::current().id();
        let mut state = self.inner.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(current);
                    state.owner_count = 1;
                    return;
                }
                Some(owner) if owner == current => {
                    state.owner_count += 1;
                    return;
                }
                Some(_) => {
                    state.waiting_threads += 1;
                    self.inner.owner_cond.wait(&mut state);
                    state.waiting_threads = state.waiting_threads.saturating_sub(1);
                }
            }
        }
    }

    pub fn release(&self) {
        let mut state = self.inner.state.lock();
        let current = std::thread::current().id();
        if state.owner != Some(current) {
            log::warn!("MainContext::release called by a non-owning thread");
            return;
        }
        state.owner_count -= 1;
        if state.owner_count == 0 {
            state.owner = None;
            if state.waiting_threads > 0 {
                self.inner.owner_cond.broadcast();
            }
        }
    }

    pub fn is_owner(&self) -> bool {
        let state = self.inner.state.lock();
        state.owner == Some(std::thread::current().id())
    }

    fn run_cycle(&self, may_block: bool, peek_only: bool) -> CycleOutcome {
        if !self.acquire() {
            return CycleOutcome { dispatched: false, dispatched_or_would_dispatch: false };
        }

        let outcome = self.run_cycle_owned(may_block, peek_only);
        self.release();
        outcome
    }

    fn run_cycle_owned(&self, may_block: bool, peek_only: bool) -> CycleOutcome {
        if self.inner.in_iteration.swap(true, Ordering::AcqRel) {
            log::warn!("reentrant MainContext iteration detected; ignoring nested call");
            self.inner.in_iteration.store(false, Ordering::Release);
            return CycleOutcome { dispatched: false, dispatched_or_would_dispatch: false };
        }

        let sources = self.prepare();
        let (timeout, any_ready) = self.compute_timeout(&sources, may_block);

        if peek_only {
            self.inner.in_iteration.store(false, Ordering::Release);
            return CycleOutcome { dispatched: false, dispatched_or_would_dispatch: any_ready };
        }

        self.poll_and_check(timeout);
        let dispatched = self.dispatch();

        self.inner.in_iteration.store(false, Ordering::Release);
        CycleOutcome { dispatched, dispatched_or_would_dispatch: dispatched }
    }

    fn prepare(&self) -> Vec<Arc<Source>> {
        let sources: Vec<Arc<Source>> = {
            let state = self.inner.state.lock();
            state
                .sources_by_priority
                .values()
                .flatten()
                .filter(|s| !s.is_destroyed())
                .cloned()
                .collect()
        };

        let mut all = Vec::with_capacity(sources.len());
        for source in &sources {
            self.prepare_one(source);
            all.push(Arc::clone(source));
            let children: Vec<Arc<Source>> = source.state.lock().children.clone();
            for child in &children {
                self.prepare_one(child);
                if child.state.lock().ready {
                    child.propagate_ready_to_parents();
                }
                all.push(Arc::clone(child));
            }
        }
        all
    }

    fn prepare_one(&self, source: &Arc<Source>) {
        if source.is_destroyed() {
            return;
        }
        let blocked = source.state.lock().blocked;
        if blocked {
            return;
        }
        let (ready, hint) = source.funcs.prepare(source);
        let mut state = source.state.lock();
        state.ready = ready;
        drop(state);
        if let Some(hint) = hint {
            let deadline = crate::clock::monotonic_micros() + hint.as_micros() as i64;
            let current = source.ready_time();
            if current == crate::source::READY_TIME_NEVER || deadline < current {
                source.ready_time.store(deadline, Ordering::Release);
            }
        }
    }

    fn compute_timeout(&self, sources: &[Arc<Source>], may_block: bool) -> (Option<Duration>, bool) {
        let now = crate::clock::monotonic_micros();
        let mut earliest: Option<i64> = None;
        let mut any_ready = false;

        for source in sources {
            let ready_time = source.ready_time();
            let is_ready = source.state.lock().ready;
            if is_ready {
                any_ready = true;
            }
            if ready_time == crate::source::READY_TIME_NEVER {
                continue;
            }
            if ready_time <= now {
                any_ready = true;
            }
            earliest = Some(earliest.map_or(ready_time, |e| e.min(ready_time)));
        }

        if any_ready {
            return (Some(Duration::from_millis(0)), true);
        }
        if !may_block {
            return (Some(Duration::from_millis(0)), false);
        }
        match earliest {
            Some(deadline) => {
                let remaining = (deadline - now).max(0);
                (Some(Duration::from_micros(remaining as u64)), false)
            }
            None => (None, false),
        }
    }

    fn poll_and_check(&self, timeout: Option<Duration>) {
        let (mut fds, tags): (Vec<PollFd>, Vec<crate::source::PollTag>) = {
            let state = self.inner.state.lock();
            let mut entries: Vec<(&crate::source::PollTag, &FullRegistration)> = state.registrations.iter().collect();
            entries.sort_by_key(|(_, r)| r.fd);
            let mut fds = Vec::with_capacity(entries.len() + 1);
            let mut tags = Vec::with_capacity(entries.len() + 1);
            fds.push(self.inner.wakeup.poll_fd());
            tags.push(self.inner.wakeup_tag);
            for (tag, reg) in entries {
                fds.push(PollFd::new(reg.fd, reg.events));
                tags.push(*tag);
            }
            (fds, tags)
        };

        if poll_debug_enabled() {
            log::debug!("polling {} fds, timeout={:?}", fds.len(), timeout);
        }

        let result = self.inner.poll_fn.poll(&mut fds, timeout);
        let n_ready = match result {
            Ok(n) => n,
            Err(e) => {
                log::warn!("poll failed: {e}");
                return;
            }
        };
        if n_ready == 0 {
            return;
        }

        let mut woke = false;
        let owners: HashMap<crate::source::PollTag, Weak<Source>> = {
            let state = self.inner.state.lock();
            state.registrations.iter().map(|(t, r)| (*t, r.owner.clone())).collect()
        };

        let mut ready_sources: Vec<Arc<Source>> = Vec::new();
        for (tag, fd) in tags.iter().zip(fds.iter()) {
            if fd.revents.is_empty() {
                continue;
            }
            if *tag == self.inner.wakeup_tag {
                woke = true;
                continue;
            }
            if let Some(source) = owners.get(tag).and_then(Weak::upgrade) {
                let mut st = source.state.lock();
                st.ready = true;
                if let Some(record) = st.poll_fds.iter_mut().find(|r| r.tag == *tag) {
                    record.revents = fd.revents;
                }
                drop(st);
                source.propagate_ready_to_parents();
                ready_sources.push(source);
            }
        }

        if woke {
            let _ = self.inner.wakeup.acknowledge();
        }

        for source in ready_sources {
            let checked = source.funcs.check(&source);
            if checked {
                source.state.lock().ready = true;
                source.propagate_ready_to_parents();
            }
        }
    }

    /// Dispatches ready sources, highest-priority bucket first, stopping at
    /// the first priority level that contained no ready source this pass.
    /// `check` is conceptually what "tightens" `max_priority` to the
    /// priority of the first ready source found; once a lower-priority
    /// (numerically larger) bucket is reached after that, it is left for a
    /// later iteration rather than dispatched alongside it.
    fn dispatch(&self) -> bool {
        let buckets: Vec<(Priority, Vec<Arc<Source>>)> = {
            let state = self.inner.state.lock();
            state.sources_by_priority.iter().map(|(p, v)| (*p, v.clone())).collect()
        };

        let max_priority = buckets.iter().find_map(|(priority, sources)| {
            let any_ready = sources
                .iter()
                .any(|s| !s.is_destroyed() && s.state.lock().ready);
            any_ready.then_some(*priority)
        });
        let max_priority = match max_priority {
            Some(p) => p,
            None => return false,
        };

        let mut dispatched_any = false;
        for (priority, sources) in buckets {
            if priority > max_priority {
                break;
            }
            for source in sources {
                if source.is_destroyed() {
                    continue;
                }
                let ready = source.state.lock().ready;
                if !ready {
                    continue;
                }
                source.state.lock().ready = false;
                let keep = source.funcs.dispatch(&source);
                dispatched_any = true;
                if !keep {
                    source.destroy();
                }
            }
        }
        dispatched_any
    }
}

impl ContextInner {
    fn register_fd(&self, tag: crate::source::PollTag, source: Arc<Source>, fd: crate::poll_fn::RawFd, events: IoCondition) {
        let mut state = self.state.lock();
        state.registrations.insert(
            tag,
            FullRegistration {
                fd,
                events,
                owner: Arc::downgrade(&source),
            },
        );
    }

    pub(crate) fn add_poll_record(&self, source: &Arc<Source>, tag: crate::source::PollTag, fd: crate::poll_fn::RawFd, events: IoCondition, _priority: Priority) {
        self.register_fd(tag, Arc::clone(source), fd, events);
        self.wakeup_for_source_change();
    }

    pub(crate) fn remove_poll_record(&self, tag: crate::source::PollTag) {
        self.state.lock().registrations.remove(&tag);
        self.wakeup_for_source_change();
    }

    pub(crate) fn modify_poll_record(&self, tag: crate::source::PollTag, events: IoCondition) {
        if let Some(reg) = self.state.lock().registrations.get_mut(&tag) {
            reg.events = events;
        }
        self.wakeup_for_source_change();
    }

    pub(crate) fn attach_child(&self, _parent: &Arc<Source>, child: &Arc<Source>) {
        let (poll_records, grandchildren) = {
            let mut st = child.state.lock();
            st.context = Some(self.self_weak.clone());
            (st.poll_fds.clone(), st.children.clone())
        };
        for record in poll_records {
            self.register_fd(record.tag, Arc::clone(child), record.fd, record.events);
        }
        for grandchild in &grandchildren {
            self.attach_child(child, grandchild);
        }
    }

    pub(crate) fn detach_source(&self, source: &Arc<Source>) {
        let id = source.id();
        let priority = source.priority();
        let mut state = self.state.lock();
        state.sources_by_id.remove(&id);
        if let Some(list) = state.sources_by_priority.get_mut(&priority) {
            list.retain(|s| !Arc::ptr_eq(s, source));
        }
    }

    pub(crate) fn reprioritize_source(&self, source: &Arc<Source>, new_priority: Priority) {
        let old_priority = source.priority();
        if old_priority == new_priority {
            return;
        }
        let mut state = self.state.lock();
        if let Some(list) = state.sources_by_priority.get_mut(&old_priority) {
            list.retain(|s| !Arc::ptr_eq(s, source));
        }
        source.set_priority_raw(new_priority);
        state.sources_by_priority.entry(new_priority).or_default().push(Arc::clone(source));
    }

    pub(crate) fn wakeup_for_source_change(&self) {
        let _ = self.wakeup.signal();
    }
}

impl Default for MainContext {
    fn default() -> MainContext {
        MainContext::new()
    }
}

struct CycleOutcome {
    dispatched: bool,
    dispatched_or_would_dispatch: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Continue, SourceFuncs};
    use std::sync::atomic::AtomicUsize;

    struct CountingIdle(Arc<AtomicUsize>);
    impl SourceFuncs for CountingIdle {
        fn prepare(&self, _source: &Source) -> (bool, Option<Duration>) {
            (true, None)
        }
        fn dispatch(&self, _source: &Source) -> Continue {
            self.0.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    #[test]
    fn attach_and_iterate_dispatches_idle_source_once() {
        let ctx = MainContext::new();
        let count = Arc::new(AtomicUsize::new(0));
        let source = Source::new(CountingIdle(Arc::clone(&count)));
        let id = ctx.attach(Arc::clone(&source));
        assert!(id > 0);

        let dispatched = ctx.iteration(false);
        assert!(dispatched);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(source.is_destroyed());
    }

    #[test]
    fn pending_is_false_with_no_sources() {
        let ctx = MainContext::new();
        assert!(!ctx.pending());
    }

    #[test]
    fn dispatch_stops_at_the_first_ready_priority_level() {
        let ctx = MainContext::new();
        let high_count = Arc::new(AtomicUsize::new(0));
        let low_count = Arc::new(AtomicUsize::new(0));

        let low = Source::new(CountingIdle(Arc::clone(&low_count)));
        low.set_priority(crate::source::PRIORITY_LOW);
        ctx.attach(low);

        let high = Source::new(CountingIdle(Arc::clone(&high_count)));
        high.set_priority(crate::source::PRIORITY_HIGH);
        ctx.attach(high);

        // Both sources are ready, but the low-priority one must wait for a
        // separate iteration once the high-priority one has been seen ready.
        assert!(ctx.iteration(false));
        assert_eq!(high_count.load(Ordering::SeqCst), 1);
        assert_eq!(low_count.load(Ordering::SeqCst), 0);

        assert!(ctx.iteration(false));
        assert_eq!(high_count.load(Ordering::SeqCst), 1);
        assert_eq!(low_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn acquire_release_round_trips() {
        let ctx = MainContext::new();
        assert!(ctx.acquire());
        assert!(ctx.is_owner());
        ctx.release();
        assert!(!ctx.is_owner());
    }

    #[test]
    fn thread_default_stack_pushes_and_pops() {
        let ctx = MainContext::new();
        assert!(MainContext::thread_default().is_none());
        ctx.push_thread_default();
        assert!(MainContext::thread_default().is_some());
        ctx.pop_thread_default();
        assert!(MainContext::thread_default().is_none());
    }
}
