//! OpenBSD futex(2) backend

use super::FutexResult;
use std::io;
use std::ptr;
use std::sync::atomic::AtomicU32;

pub(super) fn wait(word: &AtomicU32, expected: u32) -> FutexResult<()> {
    // SAFETY: `word` stays valid for the call; no timeout, no second word.
    let r = unsafe {
        libc::futex(
            word.as_ptr(),
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            expected as libc::c_int,
            ptr::null(),
            ptr::null_mut(),
        )
    };
    if r >= 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EAGAIN) | Some(libc::EINTR) => Ok(()),
        _ => Err(err.into()),
    }
}

pub(super) fn wake(word: &AtomicU32) -> FutexResult<()> {
    // SAFETY: as above.
    let r = unsafe {
        libc::futex(
            word.as_ptr(),
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
            1,
            ptr::null(),
            ptr::null_mut(),
        )
    };
    if r >= 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error().into())
    }
}
