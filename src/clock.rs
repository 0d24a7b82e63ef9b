//! Monotonic and wall-clock time, in microseconds.
//!
//! Every timeout and ready-time in the crate is expressed in monotonic
//! microseconds: a clock that never moves backwards, immune to NTP/user
//! clock adjustments.

use std::sync::OnceLock;
use std::time::Instant;

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Microseconds since an arbitrary, process-local epoch. Only differences
/// between two calls are meaningful.
pub fn monotonic_micros() -> i64 {
    let elapsed = Instant::now().duration_since(epoch());
    elapsed.as_micros() as i64
}

/// Microseconds since the Unix epoch, per the system wall clock. Used only
/// for diagnostics; never for scheduling (see `monotonic_micros`).
pub fn wall_micros() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_never_goes_backwards() {
        let a = monotonic_micros();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = monotonic_micros();
        assert!(b >= a);
    }

    #[test]
    fn wall_clock_is_plausible() {
        // After 2020-01-01 in micros.
        assert!(wall_micros() > 1_577_836_800_000_000);
    }
}
