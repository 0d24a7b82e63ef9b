//! Windows backend: `WaitForMultipleObjectsEx` in place of `poll(2)`, and an
//! auto-reset event as the [`Wakeup`] token.
//!
//! This mirrors the Unix backend's `sys/unix` split but stays a
//! best-effort surface: it is sufficient to compile and to satisfy the
//! platform-neutral contract (the Windows console-process-helper
//! distinction is out of scope here), not a full IOCP implementation of
//! readiness for arbitrary handles.

mod poll;
mod wakeup_impl;

pub use poll::poll;
pub use wakeup_impl::Wakeup;
