//! Fiber identity and the scheduler-facing context trait
//!
//! Synchronization primitives in this crate never look up the running fiber
//! through global state. The scheduler hands them a [`FiberContext`] for the
//! fiber making the call, and the primitive uses it to identify the caller,
//! to record how to wake it, and to suspend it.

mod thread;

pub use thread::ThreadFiber;

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::Waker;

/// Unique identifier for a Fiber
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FiberId(NonZeroU64);

static NEXT_FIBER_ID: AtomicU64 = AtomicU64::new(1);

impl FiberId {
    /// Generate a new unique FiberId
    pub fn new() -> Self {
        let id = NEXT_FIBER_ID.fetch_add(1, Ordering::Relaxed);
        // Only reachable after 2^64 allocations.
        FiberId(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0.get()
    }

    /// Create a FiberId from a u64 value (`None` for zero)
    pub fn from_u64(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(FiberId)
    }
}

impl Default for FiberId {
    fn default() -> Self {
        Self::new()
    }
}

/// The scheduler's view of the fiber currently running on this OS thread
///
/// Implementations must uphold two properties the fiber
/// [`Mutex`](crate::sync::Mutex) relies on to avoid lost wakeups:
///
/// - A wake delivered through [`waker`](Self::waker) after the waker was
///   taken but before [`suspend`](Self::suspend) is entered is latched, and
///   makes that `suspend` return immediately.
/// - `suspend` does not return spuriously: it returns only after the waker
///   (or a clone of it) was woken.
pub trait FiberContext {
    /// Identity of the calling fiber (stable for its lifetime, unique among
    /// live fibers)
    fn id(&self) -> FiberId;

    /// A waker that makes the calling fiber runnable again
    fn waker(&self) -> Waker;

    /// Yield to the scheduler until the fiber is woken.
    ///
    /// Suspends the fiber, not the OS thread: the scheduler is free to run
    /// other fibers on this thread in the meantime.
    fn suspend(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiber_id_uniqueness() {
        let id1 = FiberId::new();
        let id2 = FiberId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn test_fiber_id_from_u64() {
        assert_eq!(FiberId::from_u64(42).map(FiberId::as_u64), Some(42));
        assert_eq!(FiberId::from_u64(0), None);
    }

    #[test]
    fn test_option_fiber_id_is_word_sized() {
        assert_eq!(
            std::mem::size_of::<Option<FiberId>>(),
            std::mem::size_of::<u64>()
        );
    }
}
