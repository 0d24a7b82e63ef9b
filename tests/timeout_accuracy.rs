//! Millisecond timers fire neither too early nor wildly late, and a
//! repeating timer keeps firing until its callback returns `false`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use evloop::context::MainContext;
use evloop::sources::timeout_add;

#[test]
fn timeout_does_not_fire_before_its_interval() {
    let ctx = MainContext::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&fired);
    timeout_add(&ctx, Duration::from_millis(50), move || {
        f.fetch_add(1, Ordering::SeqCst);
        false
    });

    let start = Instant::now();
    // Nothing is ready yet; iteration(false) must not block and must not
    // dispatch the timer before its deadline.
    ctx.iteration(false);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[test]
fn timeout_fires_once_interval_elapses_and_then_stops() {
    let ctx = MainContext::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&fired);
    timeout_add(&ctx, Duration::from_millis(20), move || {
        f.fetch_add(1, Ordering::SeqCst);
        false
    });

    let deadline = Instant::now() + Duration::from_secs(2);
    while fired.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        ctx.iteration(true);
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // A few more iterations must not re-fire a one-shot (return-false)
    // timer.
    for _ in 0..5 {
        ctx.iteration(false);
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn repeating_timeout_fires_multiple_times_then_stops() {
    let ctx = MainContext::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    timeout_add(&ctx, Duration::from_millis(10), move || {
        let n = c.fetch_add(1, Ordering::SeqCst) + 1;
        n < 3
    });

    let deadline = Instant::now() + Duration::from_secs(2);
    while count.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        ctx.iteration(true);
    }
    assert_eq!(count.load(Ordering::SeqCst), 3);

    for _ in 0..5 {
        ctx.iteration(false);
    }
    assert_eq!(count.load(Ordering::SeqCst), 3);
}
