//! Platform glue.
//!
//! Everything above this module is written against the small surface
//! re-exported here: a default [`poll`] function, a [`Wakeup`] token, and a
//! handful of fd/signal helpers. Adding a platform means implementing this
//! module's surface for it; nothing elsewhere in the crate is platform-aware.

#[cfg(unix)]
pub use self::unix::{poll, signal as unix_signal, thread as unix_thread, Wakeup};

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub use self::windows::{poll, Wakeup};

#[cfg(windows)]
pub mod windows;
