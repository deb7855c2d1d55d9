//! Windows WaitOnAddress backend

use super::FutexResult;
use std::ffi::c_void;
use std::io;
use std::mem;
use std::sync::atomic::AtomicU32;
use windows_sys::Win32::System::Threading::{WaitOnAddress, WakeByAddressSingle, INFINITE};

pub(super) fn wait(word: &AtomicU32, expected: u32) -> FutexResult<()> {
    let address = word.as_ptr() as *const c_void;
    let compare = &expected as *const u32 as *const c_void;
    // SAFETY: both pointers reference live 4-byte values for the whole call.
    let ok = unsafe { WaitOnAddress(address, compare, mem::size_of::<u32>(), INFINITE) };
    if ok != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error().into())
    }
}

pub(super) fn wake(word: &AtomicU32) -> FutexResult<()> {
    // SAFETY: the address only identifies the wait list; it is not read.
    unsafe { WakeByAddressSingle(word.as_ptr() as *const c_void) };
    Ok(())
}
