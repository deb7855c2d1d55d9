//! Linux futex backend

use super::FutexResult;
use std::io;
use std::ptr;
use std::sync::atomic::AtomicU32;

// Process-private futexes: the word never lives in shared memory.
const FUTEX_WAIT_OP: libc::c_int = libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG;
const FUTEX_WAKE_OP: libc::c_int = libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG;

pub(super) fn wait(word: &AtomicU32, expected: u32) -> FutexResult<()> {
    // SAFETY: `word` is a live, aligned 32-bit atomic for the whole call and
    // the null timeout means "wait forever".
    let r = unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            FUTEX_WAIT_OP,
            expected,
            ptr::null::<libc::timespec>(),
        )
    };
    if r >= 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Value already changed, or a signal arrived: a plain spurious return.
        Some(libc::EAGAIN) | Some(libc::EINTR) => Ok(()),
        _ => Err(err.into()),
    }
}

pub(super) fn wake(word: &AtomicU32) -> FutexResult<()> {
    // SAFETY: as above; FUTEX_WAKE ignores the remaining arguments.
    let r = unsafe { libc::syscall(libc::SYS_futex, word.as_ptr(), FUTEX_WAKE_OP, 1) };
    if r >= 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error().into())
    }
}
