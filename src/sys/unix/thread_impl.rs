//! Best-effort scheduler-attribute inheritance for spawned threads.
//!
//! `sched_getattr`/`sched_setattr` aren't exposed by every `libc` target, so
//! this goes through the raw syscall numbers the way glibc itself does
//! internally for this pair. Capture happens on the spawning thread (as
//! `gettid()` there), apply happens from inside the new thread's own body
//! (as `gettid()` there) — a cross-thread snapshot-and-apply, not a live
//! tid-to-tid copy.

#[cfg(target_os = "linux")]
mod linux {
    const SYS_SCHED_GETATTR: libc::c_long = 315;
    const SYS_SCHED_SETATTR: libc::c_long = 314;
    const ATTR_SIZE: u32 = 48;

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct SchedAttr {
        size: u32,
        sched_policy: u32,
        sched_flags: u64,
        sched_nice: i32,
        sched_priority: u32,
        sched_runtime: u64,
        sched_deadline: u64,
        sched_period: u64,
    }

    /// Reads the calling thread's scheduler attributes. `None` if the
    /// kernel doesn't support the syscall (pre-3.14, or seccomp-filtered).
    pub fn capture() -> Option<SchedAttr> {
        let mut attr = std::mem::MaybeUninit::<SchedAttr>::zeroed();
        let ret = unsafe {
            libc::syscall(SYS_SCHED_GETATTR, 0 /* self */, attr.as_mut_ptr(), ATTR_SIZE, 0u32)
        };
        if ret != 0 {
            return None;
        }
        Some(unsafe { attr.assume_init() })
    }

    /// Applies a previously captured snapshot to the calling thread.
    /// Failure is silently ignored — best-effort, not a contract.
    pub fn apply(attr: &SchedAttr) {
        unsafe {
            libc::syscall(SYS_SCHED_SETATTR, 0 /* self */, attr as *const SchedAttr, 0u32);
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::{capture, SchedAttr};

#[cfg(target_os = "linux")]
pub fn apply(attr: &SchedAttr) {
    linux::apply(attr)
}

#[cfg(not(target_os = "linux"))]
#[derive(Clone, Copy)]
pub struct SchedAttr;

#[cfg(not(target_os = "linux"))]
pub fn capture() -> Option<SchedAttr> {
    None
}

#[cfg(not(target_os = "linux"))]
pub fn apply(_attr: &SchedAttr) {}

/// Best-effort thread naming for debuggers.
pub fn set_name(native: libc::pthread_t, name: &str) {
    use std::ffi::CString;
    // pthread_setname_np caps names at 15 bytes + NUL on Linux.
    let truncated: String = name.chars().take(15).collect();
    if let Ok(c_name) = CString::new(truncated) {
        unsafe {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            {
                libc::pthread_setname_np(native, c_name.as_ptr());
            }
            #[cfg(target_os = "macos")]
            {
                let _ = native;
                libc::pthread_setname_np(c_name.as_ptr());
            }
        }
    }
}
