//! Concrete [`SourceFuncs`](crate::source::SourceFuncs) implementations and
//! their `*_add`/`*_add_full` convenience constructors: timers, idle
//! callbacks, and (Unix only) signal and child-process watches.

mod timeout;
pub use timeout::{timeout_add, timeout_add_full, timeout_add_seconds, timeout_add_seconds_full};

mod idle;
pub use idle::{idle_add, idle_add_full};

#[cfg(all(unix, feature = "os-ext"))]
mod unix_signal;
#[cfg(all(unix, feature = "os-ext"))]
pub use unix_signal::{unix_signal_add, unix_signal_add_full};

#[cfg(all(unix, feature = "os-ext"))]
mod child_watch;
#[cfg(all(unix, feature = "os-ext"))]
pub use child_watch::{child_watch_add, child_watch_add_full, ChildStatus};
