//! Concurrency primitives: mutex, recursive mutex, reader-writer lock,
//! condition variable, thread-local slot, and one-time initialization.
//!
//! All of these are thin, renamed wrappers over `parking_lot` — the crate
//! the rest of this codebase already leans on for its word-sized, lazily
//! initialized locks rather than the heavier, syscall-backed primitives
//! `std::sync` provides on some platforms. Wrapping (instead of
//! re-exporting `parking_lot` directly) keeps the public API stable and
//! gives each type the narrower surface its GLib-shaped counterpart had.

mod cond;
mod mutex;
mod once;
mod private;
mod rec_mutex;
mod rwlock;

pub use cond::Cond;
pub use mutex::{Mutex, MutexGuard};
pub use once::Once;
pub use private::Private;
pub use rec_mutex::{RecMutex, RecMutexGuard};
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
