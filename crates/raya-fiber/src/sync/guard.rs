//! RAII guard for automatic mutex unlock

use crate::fiber::{FiberContext, FiberId};
use crate::sync::{Mutex, MutexError};
use std::marker::PhantomData;
use std::sync::Arc;

/// RAII guard for Mutex (auto-unlocks on drop)
///
/// The guard remembers which Fiber acquired the lock and releases it on
/// that Fiber's behalf. It is `!Send`, so it is dropped on the OS thread
/// that took it and cannot bypass the owner check from elsewhere. To hand a
/// locked mutex to another Fiber, unlock it and let that Fiber lock it.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a> {
    /// Reference to the mutex
    mutex: &'a Mutex,
    /// Fiber that owns the lock
    fiber: FiberId,
    /// Whether the guard has been manually unlocked
    unlocked: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'a> MutexGuard<'a> {
    /// The caller must own the lock.
    fn new(mutex: &'a Mutex, fiber: FiberId) -> Self {
        Self {
            mutex,
            fiber,
            unlocked: false,
            _not_send: PhantomData,
        }
    }

    /// Fiber holding the lock
    pub fn fiber(&self) -> FiberId {
        self.fiber
    }

    /// Manually unlock the mutex early (before drop)
    pub fn unlock(mut self) -> Result<(), MutexError> {
        self.unlocked = true;
        self.mutex.release(self.fiber)
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        if !self.unlocked {
            if let Err(err) = self.mutex.release(self.fiber) {
                tracing::error!(%err, "mutex guard failed to unlock");
            }
        }
    }
}

/// RAII guard for Arc<Mutex> (owned version)
///
/// This version owns an Arc to the mutex, allowing it to outlive
/// the original mutex reference. Like [`MutexGuard`] it stays on the OS
/// thread that acquired it.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct OwnedMutexGuard {
    /// Arc to the mutex
    mutex: Arc<Mutex>,
    /// Fiber that owns the lock
    fiber: FiberId,
    /// Whether the guard has been manually unlocked
    unlocked: bool,
    _not_send: PhantomData<*const ()>,
}

impl OwnedMutexGuard {
    /// Fiber holding the lock
    pub fn fiber(&self) -> FiberId {
        self.fiber
    }

    /// Manually unlock the mutex early (before drop)
    pub fn unlock(mut self) -> Result<(), MutexError> {
        self.unlocked = true;
        self.mutex.release(self.fiber)
    }

    /// Get a reference to the mutex
    pub fn mutex(&self) -> &Arc<Mutex> {
        &self.mutex
    }
}

impl Drop for OwnedMutexGuard {
    fn drop(&mut self) {
        if !self.unlocked {
            if let Err(err) = self.mutex.release(self.fiber) {
                tracing::error!(%err, "owned mutex guard failed to unlock");
            }
        }
    }
}

impl Mutex {
    /// Lock with RAII guard (borrowed version)
    pub fn lock_guard<C: FiberContext + ?Sized>(
        &self,
        cx: &C,
    ) -> Result<MutexGuard<'_>, MutexError> {
        self.lock(cx)?;
        Ok(MutexGuard::new(self, cx.id()))
    }

    /// Non-suspending lock with RAII guard
    ///
    /// `Ok(None)` when the mutex could not be taken immediately.
    pub fn try_lock_guard<C: FiberContext + ?Sized>(
        &self,
        cx: &C,
    ) -> Result<Option<MutexGuard<'_>>, MutexError> {
        Ok(self
            .try_lock(cx)?
            .then(|| MutexGuard::new(self, cx.id())))
    }

    /// Lock with RAII guard holding an `Arc` to the mutex
    pub fn lock_owned<C: FiberContext + ?Sized>(
        self: &Arc<Self>,
        cx: &C,
    ) -> Result<OwnedMutexGuard, MutexError> {
        self.lock(cx)?;
        Ok(OwnedMutexGuard {
            mutex: Arc::clone(self),
            fiber: cx.id(),
            unlocked: false,
            _not_send: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::ThreadFiber;

    // Inherent consts win over the blanket trait const only when `T: Send`.
    trait AssumeNotSend {
        const IS_SEND: bool = false;
    }

    struct SendCheck<T: ?Sized>(PhantomData<T>);

    impl<T: ?Sized> AssumeNotSend for SendCheck<T> {}

    impl<T: ?Sized + Send> SendCheck<T> {
        const IS_SEND: bool = true;
    }

    #[test]
    fn test_guards_stay_on_their_thread() {
        assert!(SendCheck::<Arc<Mutex>>::IS_SEND);
        assert!(!SendCheck::<MutexGuard<'static>>::IS_SEND);
        assert!(!SendCheck::<OwnedMutexGuard>::IS_SEND);
    }

    #[test]
    fn test_owned_guard_drop_wakes_waiter() {
        let mutex = Arc::new(Mutex::new());
        let cx = ThreadFiber::current();
        let guard = mutex.lock_owned(&cx).unwrap();

        let waiter = {
            let mutex = mutex.clone();
            std::thread::spawn(move || {
                let cx = ThreadFiber::current();
                let guard = mutex.lock_guard(&cx).unwrap();
                guard.fiber()
            })
        };
        while mutex.waiting_count() == 0 {
            std::thread::yield_now();
        }

        // Released by the fiber that acquired it.
        drop(guard);
        let waiter_id = waiter.join().unwrap();
        assert_ne!(waiter_id, cx.id());
        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_mutex_guard_auto_unlock() {
        let mutex = Mutex::new();
        let cx = ThreadFiber::current();

        {
            let guard = mutex.lock_guard(&cx).unwrap();
            assert_eq!(guard.fiber(), cx.id());
            assert!(mutex.is_locked_by(cx.id()));
        } // Guard dropped here

        // Mutex should be automatically unlocked
        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_mutex_guard_manual_unlock() {
        let mutex = Mutex::new();
        let cx = ThreadFiber::current();

        let guard = mutex.lock_guard(&cx).unwrap();
        assert!(mutex.is_locked());

        guard.unlock().unwrap();
        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_try_lock_guard_held_elsewhere() {
        let mutex = Arc::new(Mutex::new());
        let cx = ThreadFiber::current();

        let guard = mutex.lock_owned(&cx).unwrap();
        let other = {
            let mutex = mutex.clone();
            std::thread::spawn(move || {
                let cx = ThreadFiber::current();
                mutex.try_lock_guard(&cx).unwrap().is_some()
            })
        };
        assert!(!other.join().unwrap());

        drop(guard);
        assert!(!mutex.is_locked());
        assert!(mutex.try_lock_guard(&cx).unwrap().is_some());
    }

    #[test]
    fn test_guard_relock_is_deadlock() {
        let mutex = Mutex::new();
        let cx = ThreadFiber::current();

        let _guard = mutex.lock_guard(&cx).unwrap();
        assert!(matches!(
            mutex.try_lock_guard(&cx),
            Err(MutexError::Deadlock(_))
        ));
    }

    #[test]
    fn test_owned_mutex_guard_manual_unlock() {
        let mutex = Arc::new(Mutex::new());
        let cx = ThreadFiber::current();

        let guard = mutex.lock_owned(&cx).unwrap();
        assert!(Arc::ptr_eq(guard.mutex(), &mutex));
        assert!(mutex.is_locked());

        guard.unlock().unwrap();
        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_guard_prevents_double_unlock() {
        let mutex = Mutex::new();
        let cx = ThreadFiber::current();

        let guard = mutex.lock_guard(&cx).unwrap();

        // Manual unlock
        guard.unlock().unwrap();

        // The drop that follows must not unlock again.
        assert!(mutex.lock(&cx).is_ok());
        mutex.unlock(&cx).unwrap();
    }
}
