//! Raya Fiber Synchronization
//!
//! This crate provides the synchronization layer shared by Raya's fiber
//! schedulers:
//! - Word-level wait/wake on a 32-bit atomic (futex-style OS thread parking)
//! - A one-permit thread parker for idle worker threads
//! - A fiber-aware Mutex that suspends the calling fiber instead of
//!   blocking the OS thread running it
//!
//! The scheduler plugs in through [`FiberContext`], which exposes the
//! identity of the running fiber, a waker for it, and its suspension point.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod fiber;
pub mod futex;
pub mod park;
pub mod sync;

pub use fiber::{FiberContext, FiberId, ThreadFiber};
pub use futex::{FutexError, FutexResult};
pub use park::{Parker, ParkerOptions};
pub use sync::{Mutex, MutexError, MutexGuard, OwnedMutexGuard};
