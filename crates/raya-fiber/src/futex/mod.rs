//! Word-level wait/wake for parking OS threads
//!
//! [`wait`] blocks the calling OS thread on a 32-bit atomic word and [`wake`]
//! releases at most one thread blocked on the same word. The backend is
//! picked at compile time, one module per target family:
//!
//! - Linux / Android: `SYS_futex` (private, wake one)
//! - OpenBSD: `futex(2)` (private, wake one)
//! - Windows: `WaitOnAddress` / `WakeByAddressSingle`
//! - macOS: `os_sync_wait_on_address` / `os_sync_wake_by_address_any`
//!
//! Other targets fail to build. A no-op fallback would turn every idle
//! worker into a livelocked spinner.
//!
//! `wait` may return spuriously. Callers must re-check their own condition
//! in a loop; nothing here retries.

use std::io;
use std::sync::atomic::AtomicU32;

#[cfg(any(target_os = "linux", target_os = "android"))]
#[path = "linux.rs"]
mod sys;

#[cfg(target_os = "openbsd")]
#[path = "openbsd.rs"]
mod sys;

#[cfg(windows)]
#[path = "windows.rs"]
mod sys;

#[cfg(target_os = "macos")]
#[path = "darwin.rs"]
mod sys;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "openbsd",
    target_os = "macos",
    windows
)))]
compile_error!("raya-fiber: no word-wait backend for this target");

/// Errors reported by the word-wait primitive
#[derive(Debug, thiserror::Error)]
pub enum FutexError {
    /// The platform rejected the wait or wake call
    #[error("Word-wait primitive unavailable: {0}")]
    Unavailable(#[from] io::Error),
}

/// Word-wait result
pub type FutexResult<T> = Result<T, FutexError>;

/// Block the calling OS thread while `word` holds `expected`.
///
/// Returns once another thread calls [`wake`] on `word`, or whenever the
/// platform decides the value may have changed. The word is not guaranteed
/// to differ from `expected` on return.
#[inline]
pub fn wait(word: &AtomicU32, expected: u32) -> FutexResult<()> {
    sys::wait(word, expected)
}

/// Wake at most one OS thread blocked in [`wait`] on `word`.
///
/// Having nobody to wake is not an error.
#[inline]
pub fn wake(word: &AtomicU32) -> FutexResult<()> {
    sys::wake(word)
}
