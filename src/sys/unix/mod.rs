//! Unix backend: `poll(2)`, an `eventfd`/self-pipe [`Wakeup`], signal and
//! thread helpers.

mod poll;
mod signal_impl;
mod thread_impl;
mod wakeup_impl;

pub use poll::poll;
pub use wakeup_impl::Wakeup;

pub mod signal {
    pub use super::signal_impl::*;
}

pub mod thread {
    pub use super::thread_impl::*;
}
