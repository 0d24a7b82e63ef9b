//! End-to-end dispatch ordering: within one iteration only the
//! highest-ready-priority (numerically lowest) sources run; lower-priority
//! ready sources wait for a subsequent iteration.

use std::sync::{Arc, Mutex};

use evloop::context::MainContext;
use evloop::source::{PRIORITY_DEFAULT, PRIORITY_HIGH, PRIORITY_LOW};
use evloop::sources::idle_add_full;

#[test]
fn higher_priority_sources_dispatch_first_one_per_iteration() {
    let ctx = MainContext::new();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let o = Arc::clone(&order);
    idle_add_full(&ctx, PRIORITY_LOW, move || {
        o.lock().unwrap().push("low");
        false
    });

    let o = Arc::clone(&order);
    idle_add_full(&ctx, PRIORITY_HIGH, move || {
        o.lock().unwrap().push("high");
        false
    });

    let o = Arc::clone(&order);
    idle_add_full(&ctx, PRIORITY_DEFAULT, move || {
        o.lock().unwrap().push("default");
        false
    });

    // All three idle sources are ready from the start, but each iteration
    // tightens its dispatch pass to the single highest-ready priority: the
    // other two remain ready and wait for later iterations.
    assert!(ctx.iteration(false));
    assert_eq!(*order.lock().unwrap(), vec!["high"]);

    assert!(ctx.iteration(false));
    assert_eq!(*order.lock().unwrap(), vec!["high", "default"]);

    assert!(ctx.iteration(false));
    assert_eq!(*order.lock().unwrap(), vec!["high", "default", "low"]);

    // Nothing left to dispatch.
    assert!(!ctx.iteration(false));
}

#[test]
fn two_priority_idle_sources_dispatch_one_per_iteration() {
    // Mirrors the documented scenario: idle source A at a lower priority
    // (numerically larger) and idle source B at a higher priority
    // (numerically smaller). One iteration dispatches B; a subsequent
    // iteration dispatches A.
    let ctx = MainContext::new();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let o = Arc::clone(&order);
    idle_add_full(&ctx, 200, move || {
        o.lock().unwrap().push("a");
        false
    });

    let o = Arc::clone(&order);
    idle_add_full(&ctx, 100, move || {
        o.lock().unwrap().push("b");
        false
    });

    assert!(ctx.iteration(false));
    assert_eq!(*order.lock().unwrap(), vec!["b"]);

    assert!(ctx.iteration(false));
    assert_eq!(*order.lock().unwrap(), vec!["b", "a"]);
}
