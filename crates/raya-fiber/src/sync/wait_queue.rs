//! Queue of fibers suspended on a synchronization object
//!
//! The queue lives inside the state guarded by the owning primitive's spin
//! guard. Both operations consume that guard, so the primitive cannot
//! release it at the wrong moment.

use crate::fiber::{FiberContext, FiberId};
use parking_lot::MutexGuard as SpinGuard;
use std::collections::VecDeque;
use std::task::Waker;

/// A suspended fiber and the way to make it runnable again
struct Waiter {
    fiber: FiberId,
    waker: Waker,
}

/// FIFO queue of suspended fibers
#[derive(Default)]
pub(crate) struct WaitQueue {
    waiters: VecDeque<Waiter>,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub(crate) fn contains(&self, fiber: FiberId) -> bool {
        self.waiters.iter().any(|w| w.fiber == fiber)
    }

    /// Drop `fiber`'s entry, if it is still queued
    pub(crate) fn remove(&mut self, fiber: FiberId) -> bool {
        match self.waiters.iter().position(|w| w.fiber == fiber) {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn fibers(&self) -> Vec<FiberId> {
        self.waiters.iter().map(|w| w.fiber).collect()
    }

    /// Record `fiber` at the tail; a fiber is queued at most once.
    pub(crate) fn push(&mut self, fiber: FiberId, waker: Waker) {
        debug_assert!(!self.contains(fiber), "fiber {:?} queued twice", fiber);
        self.waiters.push_back(Waiter { fiber, waker });
    }

    /// Enqueue the calling fiber, release `guard`, and suspend.
    ///
    /// The waiter is recorded while the guard is still held, so any unlock
    /// that runs after the release finds it. A wake that lands between the
    /// release and the suspension is latched by the context.
    pub(crate) fn suspend_and_wait<S, C>(mut guard: SpinGuard<'_, S>, cx: &C)
    where
        S: AsMut<WaitQueue>,
        C: FiberContext + ?Sized,
    {
        let fiber = cx.id();
        guard.as_mut().push(fiber, cx.waker());
        drop(guard);

        tracing::trace!(fiber = fiber.as_u64(), "fiber suspended");
        cx.suspend();
        tracing::trace!(fiber = fiber.as_u64(), "fiber resumed");
    }

    /// Dequeue the oldest waiter, release `guard`, then wake it.
    ///
    /// Returns whether a fiber was woken.
    pub(crate) fn wake_one<S>(mut guard: SpinGuard<'_, S>) -> bool
    where
        S: AsMut<WaitQueue>,
    {
        let waiter = guard.as_mut().waiters.pop_front();
        drop(guard);

        match waiter {
            Some(waiter) => {
                tracing::trace!(fiber = waiter.fiber.as_u64(), "waking fiber");
                waiter.waker.wake();
                true
            }
            None => false,
        }
    }
}

impl AsMut<WaitQueue> for WaitQueue {
    fn as_mut(&mut self) -> &mut WaitQueue {
        self
    }
}
