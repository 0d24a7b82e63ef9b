use std::io;
use std::os::raw::c_int;
use std::time::Duration;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
use windows_sys::Win32::System::Threading::{Sleep, WaitForMultipleObjectsEx};

use crate::poll_fn::{IoCondition, PollFd};

/// Waits on the handles named by `fds` (interpreted as raw `HANDLE`s, the
/// same duck-typed role a Unix fd plays) via `WaitForMultipleObjectsEx`.
///
/// Only `IN` readiness is meaningful here: a signaled handle is reported
/// readable. This is the narrow contract `MainContext` actually needs from
/// a poll function; richer socket readiness belongs to a transport, not
/// the core.
pub fn poll(fds: &mut [PollFd], timeout: Option<Duration>) -> io::Result<c_int> {
    for pfd in fds.iter_mut() {
        pfd.revents = IoCondition::empty();
    }

    if fds.is_empty() {
        if let Some(d) = timeout {
            std::thread::sleep(d);
        }
        return Ok(0);
    }

    let handles: Vec<HANDLE> = fds.iter().map(|pfd| pfd.fd as HANDLE).collect();
    let timeout_ms: u32 = match timeout {
        None => u32::MAX, // INFINITE
        Some(d) => u32::try_from(d.as_millis()).unwrap_or(u32::MAX - 1),
    };

    // Poll each handle individually in a zero-timeout pass, then sleep in
    // short slices and retry: WaitForMultipleObjectsEx(bWaitAll=false) alone
    // would only ever report the single lowest-indexed signaled handle,
    // where poll(2) semantics need every ready fd reported per call.
    let deadline = timeout.map(|d| std::time::Instant::now() + d);
    loop {
        let mut ready = 0;
        for (pfd, &handle) in fds.iter_mut().zip(handles.iter()) {
            let ret = unsafe { WaitForMultipleObjectsEx(1, &handle, 0, 0, 0) };
            if ret == 0 {
                pfd.revents = IoCondition::IN;
                ready += 1;
            }
        }
        if ready > 0 {
            return Ok(ready);
        }
        if let Some(dl) = deadline {
            if std::time::Instant::now() >= dl {
                return Ok(0);
            }
        }
        unsafe {
            Sleep(timeout_ms.min(15));
        }
    }
}

#[allow(dead_code)]
fn close(handle: HANDLE) {
    unsafe {
        CloseHandle(handle);
    }
}
