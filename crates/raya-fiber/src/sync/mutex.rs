//! Fiber-aware Mutex implementation

use crate::fiber::{FiberContext, FiberId};
use crate::sync::wait_queue::WaitQueue;
use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex as SpinLock;
use std::fmt;

/// Errors that can occur when using a Mutex
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutexError {
    /// Lock attempted by the Fiber that already owns the mutex
    #[error("Deadlock: Fiber {0:?} already owns the mutex")]
    Deadlock(FiberId),

    /// Unlock called by non-owner Fiber
    #[error("Unlock called by non-owner Fiber {0:?}")]
    NotOwner(FiberId),
}

impl MutexError {
    /// Fiber that triggered the error
    pub fn fiber(&self) -> FiberId {
        match self {
            MutexError::Deadlock(fiber) | MutexError::NotOwner(fiber) => *fiber,
        }
    }
}

/// State guarded by the spin guard
struct State {
    /// Current owner Fiber (None if unlocked)
    owner: Option<FiberId>,

    /// Fibers suspended in `lock`
    queue: WaitQueue,
}

impl AsMut<WaitQueue> for State {
    fn as_mut(&mut self) -> &mut WaitQueue {
        &mut self.queue
    }
}

/// Fiber-aware Mutex
///
/// Unlike OS-level mutexes that block threads, this Mutex suspends the
/// contending Fiber and lets the thread running it move on to other Fibers.
/// Fibers on different OS threads may contend on the same Mutex.
///
/// The lock is not reentrant, and a woken waiter is not handed ownership: it
/// competes again with any Fiber arriving through `lock` or `try_lock`.
pub struct Mutex {
    /// Owner and wait queue, held only for short critical sections
    state: SpinLock<State>,

    /// Lock-free copy of `state.owner`, written only under `state`
    owner: AtomicCell<Option<FiberId>>,
}

impl Mutex {
    /// Create a new unlocked mutex
    pub fn new() -> Self {
        Self {
            state: SpinLock::new(State {
                owner: None,
                queue: WaitQueue::new(),
            }),
            owner: AtomicCell::new(None),
        }
    }

    /// Acquire the mutex, suspending the calling Fiber while it is held
    ///
    /// Returns `MutexError::Deadlock` if the caller already owns it.
    pub fn lock<C: FiberContext + ?Sized>(&self, cx: &C) -> Result<(), MutexError> {
        let fiber = cx.id();
        let mut resumed = false;

        loop {
            let mut state = self.state.lock();

            // A context that resumed early leaves its entry behind.
            if resumed {
                state.queue.remove(fiber);
            }

            let owner = state.owner;
            match owner {
                Some(owner) if owner == fiber => {
                    tracing::debug!(fiber = fiber.as_u64(), "mutex relocked by its owner");
                    return Err(MutexError::Deadlock(fiber));
                }
                None => {
                    self.set_owner(&mut state, Some(fiber));
                    return Ok(());
                }
                Some(owner) => {
                    tracing::trace!(
                        fiber = fiber.as_u64(),
                        owner = owner.as_u64(),
                        "mutex contended"
                    );
                    WaitQueue::suspend_and_wait(state, cx);
                    resumed = true;
                }
            }
        }
    }

    /// Attempt to acquire the mutex without suspending
    ///
    /// Returns:
    /// - Ok(true) if the caller now owns the mutex
    /// - Ok(false) if it is held, or its guard is momentarily contended
    /// - Err(MutexError::Deadlock) if the caller already owns it
    pub fn try_lock<C: FiberContext + ?Sized>(&self, cx: &C) -> Result<bool, MutexError> {
        let fiber = cx.id();

        let Some(mut state) = self.state.try_lock() else {
            return Ok(false);
        };

        if state.owner == Some(fiber) {
            tracing::debug!(fiber = fiber.as_u64(), "mutex try-relocked by its owner");
            return Err(MutexError::Deadlock(fiber));
        }

        if state.owner.is_none() {
            self.set_owner(&mut state, Some(fiber));
        }

        Ok(state.owner == Some(fiber))
    }

    /// Release the mutex and wake one suspended Fiber, if any
    ///
    /// Returns `MutexError::NotOwner` (leaving the mutex untouched) if the
    /// caller does not own it.
    pub fn unlock<C: FiberContext + ?Sized>(&self, cx: &C) -> Result<(), MutexError> {
        self.release(cx.id())
    }

    pub(crate) fn release(&self, fiber: FiberId) -> Result<(), MutexError> {
        let mut state = self.state.lock();

        if state.owner != Some(fiber) {
            tracing::debug!(fiber = fiber.as_u64(), "mutex unlocked by non-owner");
            return Err(MutexError::NotOwner(fiber));
        }

        self.set_owner(&mut state, None);
        WaitQueue::wake_one(state);
        Ok(())
    }

    fn set_owner(&self, state: &mut State, owner: Option<FiberId>) {
        state.owner = owner;
        self.owner.store(owner);
    }

    /// Check current owner
    pub fn owner(&self) -> Option<FiberId> {
        self.owner.load()
    }

    /// Check if the mutex is locked
    pub fn is_locked(&self) -> bool {
        self.owner.load().is_some()
    }

    /// Check if locked by a specific fiber
    pub fn is_locked_by(&self, fiber: FiberId) -> bool {
        self.owner.load() == Some(fiber)
    }

    /// Get number of suspended Fibers
    pub fn waiting_count(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Suspended Fibers, oldest first
    pub fn waiting_fibers(&self) -> Vec<FiberId> {
        self.state.lock().queue.fibers()
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("owner", &self.owner())
            .field("waiting", &self.waiting_count())
            .finish()
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        debug_assert!(
            self.state.get_mut().queue.is_empty(),
            "mutex dropped with suspended fibers"
        );
    }
}
