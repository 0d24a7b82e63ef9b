//! A source that is always ready — runs once per iteration, lowest
//! scheduling pressure of any source kind unless given a higher priority.

use std::time::Duration;

use crate::context::MainContext;
use crate::source::{Callback, Continue, Priority, Source, SourceFuncs, SourceId};

struct IdleFuncs;

impl SourceFuncs for IdleFuncs {
    fn prepare(&self, _source: &Source) -> (bool, Option<Duration>) {
        (true, None)
    }

    fn dispatch(&self, source: &Source) -> Continue {
        source.invoke_callback()
    }
}

/// Schedules `callback` to run on the next iteration of `context`, and
/// every iteration after that until it returns `false`.
pub fn idle_add_full<F>(context: &MainContext, priority: Priority, mut callback: F) -> SourceId
where
    F: FnMut() -> Continue + Send + 'static,
{
    let source = Source::new(IdleFuncs);
    source.set_priority(priority);
    source.set_callback(Callback::new(move |_src| callback()));
    context.attach(source)
}

pub fn idle_add<F>(context: &MainContext, callback: F) -> SourceId
where
    F: FnMut() -> Continue + Send + 'static,
{
    idle_add_full(context, crate::source::PRIORITY_DEFAULT_IDLE, callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn idle_runs_until_it_returns_false() {
        let ctx = MainContext::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c2 = Arc::clone(&count);
        idle_add(&ctx, move || {
            let n = c2.fetch_add(1, Ordering::SeqCst) + 1;
            n < 3
        });
        for _ in 0..5 {
            ctx.iteration(false);
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
