//! Attaching a source to a context from a different thread wakes a poll
//! that is already blocked in that context's `iteration(true)`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use evloop::context::MainContext;
use evloop::sources::idle_add;

#[test]
fn attaching_from_another_thread_wakes_a_blocked_poll() {
    let _ = env_logger::try_init();

    let ctx = MainContext::new();
    let woke = Arc::new(AtomicBool::new(false));

    let blocking_ctx = ctx.clone();
    let handle = thread::spawn(move || {
        // Nothing is attached yet, so this blocks until another thread
        // attaches a source and the wakeup fd is written to.
        blocking_ctx.iteration(true);
    });

    thread::sleep(Duration::from_millis(50));
    let w = Arc::clone(&woke);
    idle_add(&ctx, move || {
        w.store(true, Ordering::SeqCst);
        false
    });

    let deadline = Instant::now() + Duration::from_secs(2);
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    handle.join().expect("blocked iteration thread panicked");
    assert!(woke.load(Ordering::SeqCst));
}
