use std::io;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
use windows_sys::Win32::System::Threading::{CreateEventW, ResetEvent, SetEvent};

use crate::poll_fn::{IoCondition, PollFd};

/// A manual-reset Win32 event used the way `eventfd`/a self-pipe is used on
/// Unix: `signal` sets it (idempotent — setting an already-set event is a
/// no-op), `acknowledge` resets it.
#[derive(Debug)]
pub struct Wakeup {
    handle: HANDLE,
}

unsafe impl Send for Wakeup {}
unsafe impl Sync for Wakeup {}

impl Wakeup {
    pub fn new() -> io::Result<Wakeup> {
        let handle = unsafe { CreateEventW(std::ptr::null(), 1, 0, std::ptr::null()) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(Wakeup { handle })
    }

    pub fn poll_fd(&self) -> PollFd {
        PollFd::new(self.handle as crate::poll_fn::RawFd, IoCondition::IN)
    }

    pub fn signal(&self) -> io::Result<()> {
        if unsafe { SetEvent(self.handle) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn acknowledge(&self) -> io::Result<()> {
        if unsafe { ResetEvent(self.handle) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for Wakeup {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.handle);
        }
    }
}
