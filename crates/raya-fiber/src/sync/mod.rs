//! Synchronization primitives for Fiber coordination
//!
//! This module provides goroutine-style synchronization primitives that block
//! at the Fiber level instead of the OS thread level, allowing efficient
//! multi-Fiber concurrency.

mod guard;
mod mutex;
mod wait_queue;

pub use guard::{MutexGuard, OwnedMutexGuard};
pub use mutex::{Mutex, MutexError};
