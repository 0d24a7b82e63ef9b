//! A one-shot or repeating timer source.

use std::sync::OnceLock;
use std::time::Duration;

use crate::context::MainContext;
use crate::source::{Callback, Continue, Priority, Source, SourceFuncs, SourceId};

/// Per-machine/session microsecond offset used to align second-granularity
/// timers to a common wall-clock mark, so many independent one-per-second
/// timers across a machine tend to fire together instead of being spread
/// uniformly (and therefore never all idle at once). Derived from
/// `DBUS_SESSION_BUS_ADDRESS`, falling back to `HOSTNAME`, hashed with the
/// classic djb2 string hash and reduced mod one second.
fn timer_perturb_micros() -> i64 {
    static PERTURB: OnceLock<i64> = OnceLock::new();
    *PERTURB.get_or_init(|| {
        let seed = std::env::var("DBUS_SESSION_BUS_ADDRESS")
            .ok()
            .or_else(|| std::env::var("HOSTNAME").ok());
        match seed {
            Some(s) => (djb2_hash(&s).unsigned_abs() % 1_000_000) as i64,
            None => 0,
        }
    })
}

fn djb2_hash(s: &str) -> i32 {
    let mut hash: u32 = 5381;
    for byte in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u32);
    }
    hash as i32
}

/// Computes the next expiration, in monotonic microseconds, for a timer
/// whose interval is expressed in whole seconds. The microsecond remainder
/// of the result is snapped to [`timer_perturb_micros`] without ever moving
/// the expiration backwards.
fn second_aligned_expiration(current_time: i64, interval_seconds: u32) -> i64 {
    let perturb = timer_perturb_micros();
    let mut expiration = current_time + i64::from(interval_seconds) * 1_000_000;
    expiration -= perturb;
    let remainder = expiration.rem_euclid(1_000_000);
    if remainder >= 1_000_000 / 4 {
        expiration += 1_000_000 - remainder;
    } else {
        expiration -= remainder;
    }
    expiration + perturb
}

struct TimeoutFuncs {
    interval_ms: u64,
    seconds: bool,
}

impl SourceFuncs for TimeoutFuncs {
    fn prepare(&self, source: &Source) -> (bool, Option<Duration>) {
        if source.ready_time() == crate::source::READY_TIME_NEVER {
            self.arm(source);
        }
        (false, None)
    }

    fn check(&self, source: &Source) -> bool {
        source.ready_time() != crate::source::READY_TIME_NEVER
            && source.ready_time() <= crate::clock::monotonic_micros()
    }

    fn dispatch(&self, source: &Source) -> Continue {
        let keep = source.invoke_callback();
        if keep {
            self.rearm(source);
        } else {
            source.set_ready_time_raw(crate::source::READY_TIME_NEVER);
        }
        keep
    }
}

impl TimeoutFuncs {
    fn arm(&self, source: &Source) {
        let now = crate::clock::monotonic_micros();
        let next = if self.seconds {
            second_aligned_expiration(now, (self.interval_ms / 1000) as u32)
        } else {
            now + (self.interval_ms as i64) * 1000
        };
        source.set_ready_time_raw(next);
    }

    fn rearm(&self, source: &Source) {
        self.arm(source);
    }
}

/// Attaches a millisecond-granularity repeating timeout to `context`,
/// calling `callback` each time it fires. The source removes itself the
/// first time `callback` returns `false`.
pub fn timeout_add_full<F>(context: &MainContext, priority: Priority, interval: Duration, mut callback: F) -> SourceId
where
    F: FnMut() -> Continue + Send + 'static,
{
    let source = Source::new(TimeoutFuncs {
        interval_ms: interval.as_millis() as u64,
        seconds: false,
    });
    source.set_priority(priority);
    source.set_callback(Callback::new(move |_src| callback()));
    context.attach(source)
}

pub fn timeout_add<F>(context: &MainContext, interval: Duration, callback: F) -> SourceId
where
    F: FnMut() -> Continue + Send + 'static,
{
    timeout_add_full(context, crate::source::PRIORITY_DEFAULT, interval, callback)
}

/// Like [`timeout_add_full`], but the interval is in whole seconds and
/// expirations are aligned to [`timer_perturb_micros`], batching many
/// independent second-granularity timers so they tend to wake together.
pub fn timeout_add_seconds_full<F>(context: &MainContext, priority: Priority, interval_seconds: u32, mut callback: F) -> SourceId
where
    F: FnMut() -> Continue + Send + 'static,
{
    let source = Source::new(TimeoutFuncs {
        interval_ms: u64::from(interval_seconds) * 1000,
        seconds: true,
    });
    source.set_priority(priority);
    source.set_callback(Callback::new(move |_src| callback()));
    context.attach(source)
}

pub fn timeout_add_seconds<F>(context: &MainContext, interval_seconds: u32, callback: F) -> SourceId
where
    F: FnMut() -> Continue + Send + 'static,
{
    timeout_add_seconds_full(context, crate::source::PRIORITY_DEFAULT, interval_seconds, callback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perturb_is_stable_and_bounded() {
        let p = timer_perturb_micros();
        assert!(p >= 0 && p < 1_000_000);
        assert_eq!(p, timer_perturb_micros());
    }

    #[test]
    fn second_alignment_never_moves_backwards_a_full_interval() {
        let now = 1_000_000_000;
        let next = second_aligned_expiration(now, 1);
        assert!(next >= now);
        assert!(next <= now + 2_000_000);
    }
}
