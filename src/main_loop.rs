//! [`MainLoop`]: a thin `run`/`quit` wrapper around repeated iteration of a
//! [`MainContext`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::context::MainContext;

struct MainLoopInner {
    context: MainContext,
    running: AtomicBool,
}

/// Drives a [`MainContext`] until told to stop.
///
/// `run` repeatedly calls [`MainContext::iteration`] with `may_block = true`
/// until [`MainLoop::quit`] flips the running flag, checked between
/// iterations rather than inside one — a `quit` racing a blocked `poll` is
/// resolved by the same wakeup mechanism any other cross-thread source
/// change uses.
#[derive(Clone)]
pub struct MainLoop {
    inner: Arc<MainLoopInner>,
}

impl MainLoop {
    /// Creates a loop bound to `context`, or the thread-default context if
    /// `context` is `None`.
    pub fn new(context: Option<MainContext>) -> MainLoop {
        let context = context.unwrap_or_else(|| MainContext::thread_default().unwrap_or_default());
        MainLoop {
            inner: Arc::new(MainLoopInner {
                context,
                running: AtomicBool::new(false),
            }),
        }
    }

    pub fn context(&self) -> MainContext {
        self.inner.context.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Blocks the calling thread, iterating `context` until `quit` is
    /// called. Reentrant: a nested `run` called from within a dispatched
    /// source runs its own inner loop and returns once its own `quit` fires.
    pub fn run(&self) {
        self.inner.running.store(true, Ordering::Release);
        while self.inner.running.load(Ordering::Acquire) {
            self.inner.context.iteration(true);
        }
    }

    /// Stops the nearest enclosing `run` on this loop. Safe to call from any
    /// thread, including from within a dispatched source.
    pub fn quit(&self) {
        self.inner.running.store(false, Ordering::Release);
        self.inner.context.wakeup_for_source_change();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Continue, Source, SourceFuncs};
    use std::time::Duration;

    struct QuitAfterOne(MainLoop);
    impl SourceFuncs for QuitAfterOne {
        fn prepare(&self, _source: &Source) -> (bool, Option<Duration>) {
            (true, None)
        }
        fn dispatch(&self, _source: &Source) -> Continue {
            self.0.quit();
            false
        }
    }

    #[test]
    fn run_returns_after_quit() {
        let ctx = MainContext::new();
        let main_loop = MainLoop::new(Some(ctx.clone()));
        let source = Source::new(QuitAfterOne(main_loop.clone()));
        ctx.attach(source);
        main_loop.run();
        assert!(!main_loop.is_running());
    }
}
