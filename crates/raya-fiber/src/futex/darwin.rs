//! macOS os_sync wait-on-address backend
//!
//! `os_sync_wait_on_address` and `os_sync_wake_by_address_any` first shipped
//! in macOS 14.4. They are looked up with `dlsym` on first use instead of
//! being linked directly, so a binary built here still loads on older
//! releases and reports [`FutexError::Unavailable`] there.

use super::{FutexError, FutexResult};
use std::ffi::{c_int, c_void, CStr};
use std::io;
use std::mem;
use std::sync::atomic::AtomicU32;
use std::sync::OnceLock;

type WaitOnAddressFn = unsafe extern "C" fn(*mut c_void, u64, libc::size_t, u32) -> c_int;
type WakeByAddressAnyFn = unsafe extern "C" fn(*mut c_void, libc::size_t, u32) -> c_int;

#[derive(Clone, Copy)]
struct OsSync {
    wait_on_address: WaitOnAddressFn,
    wake_by_address_any: WakeByAddressAnyFn,
}

static OS_SYNC: OnceLock<Option<OsSync>> = OnceLock::new();

fn lookup(name: &CStr) -> Option<*mut c_void> {
    // SAFETY: `name` is NUL-terminated; RTLD_DEFAULT searches every loaded image.
    let sym = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr()) };
    (!sym.is_null()).then_some(sym)
}

fn os_sync() -> FutexResult<OsSync> {
    let resolved = OS_SYNC.get_or_init(|| {
        let wait = lookup(c"os_sync_wait_on_address")?;
        let wake = lookup(c"os_sync_wake_by_address_any")?;
        // SAFETY: both symbols have the C signatures declared above in
        // <os/os_sync_wait_on_address.h>.
        Some(unsafe {
            OsSync {
                wait_on_address: mem::transmute::<*mut c_void, WaitOnAddressFn>(wait),
                wake_by_address_any: mem::transmute::<*mut c_void, WakeByAddressAnyFn>(wake),
            }
        })
    });
    (*resolved).ok_or_else(unsupported)
}

fn unsupported() -> FutexError {
    FutexError::Unavailable(io::Error::new(
        io::ErrorKind::Unsupported,
        "os_sync_wait_on_address needs macOS 14.4 or later",
    ))
}

pub(super) fn wait(word: &AtomicU32, expected: u32) -> FutexResult<()> {
    let os_sync = os_sync()?;
    // SAFETY: `word` is a live 4-byte aligned atomic for the whole call.
    let r = unsafe {
        (os_sync.wait_on_address)(
            word.as_ptr() as *mut c_void,
            u64::from(expected),
            mem::size_of::<u32>(),
            libc::OS_SYNC_WAIT_ON_ADDRESS_NONE,
        )
    };
    if r >= 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EINTR) => Ok(()),
        _ => Err(err.into()),
    }
}

pub(super) fn wake(word: &AtomicU32) -> FutexResult<()> {
    let os_sync = os_sync()?;
    // SAFETY: as above.
    let r = unsafe {
        (os_sync.wake_by_address_any)(
            word.as_ptr() as *mut c_void,
            mem::size_of::<u32>(),
            libc::OS_SYNC_WAKE_BY_ADDRESS_NONE,
        )
    };
    if r >= 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Nobody was waiting.
        Some(libc::ENOENT) => Ok(()),
        _ => Err(err.into()),
    }
}
