//! A portable event-loop core.
//!
//! `evloop` multiplexes heterogeneous event sources — timeouts, idle tasks,
//! child-process reaping, Unix signals and file-descriptor readiness — onto
//! one or more cooperating threads via a [`MainContext`], plus the
//! thread-synchronization primitives ([`sync`]), the blocking message queue
//! ([`AsyncQueue`]) and the buffered, encoding-aware I/O channel
//! ([`channel`]) that consumers of the loop build on.
//!
//! Sources are callback-driven and run to completion within a dispatch turn;
//! this is not a coroutine or task runtime (see [`source`] for the
//! prepare/check/dispatch contract each source implements).
//!
//! # Layout
//!
//! - [`context`] / [`main_loop`] — the iteration state machine and its thin
//!   run/quit shell.
//! - [`source`] / [`sources`] — the polymorphic event record and its
//!   concrete subtypes (timeout, idle, child-watch, Unix signal).
//! - [`sync`] — mutex, recursive mutex, rwlock, condvar, thread-local slot,
//!   one-time initialization.
//! - [`queue`] — the blocking, optionally sorted async queue.
//! - [`channel`] — the buffered, encoding-converting I/O channel.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations)]

#[macro_use]
mod macros;

pub mod clock;
pub mod context;
pub mod error;
pub mod main_loop;
pub mod poll_fn;
pub mod queue;
pub mod source;
pub mod sources;
pub mod sync;
pub mod thread;
pub mod wakeup;
pub mod worker;

pub mod channel;

mod sys;

pub use channel::{ChannelFlags, IoChannel};
pub use context::MainContext;
pub use error::{Error, Result, Status};
pub use main_loop::MainLoop;
pub use poll_fn::{IoCondition, PollFd};
pub use queue::{AsyncQueue, AsyncQueueGuard};
pub use source::{Priority, Source, SourceFuncs, SourceId};
