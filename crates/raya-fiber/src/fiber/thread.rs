//! Thread-backed fiber context
//!
//! Treats each OS thread as a single fiber. Suspension parks the thread on
//! its [`Parker`], so this is the context to use from code that runs outside
//! any fiber scheduler (worker bootstrap, FFI callbacks, tests).

use crate::fiber::{FiberContext, FiberId};
use crate::park::Parker;
use std::marker::PhantomData;
use std::sync::Arc;
use std::task::{Wake, Waker};

/// Wakes the owning thread by posting its parker permit
#[derive(Debug)]
struct ThreadUnparker {
    fiber: FiberId,
    parker: Parker,
}

impl Wake for ThreadUnparker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if let Err(err) = self.parker.unpark() {
            tracing::error!(fiber = self.fiber.as_u64(), %err, "failed to unpark thread fiber");
        }
    }
}

thread_local! {
    static CURRENT: Arc<ThreadUnparker> = Arc::new(ThreadUnparker {
        fiber: FiberId::new(),
        parker: Parker::new(),
    });
}

/// [`FiberContext`] for the calling OS thread
///
/// Not `Send`: suspension must happen on the thread that owns the parker.
#[derive(Debug, Clone)]
pub struct ThreadFiber {
    unparker: Arc<ThreadUnparker>,
    _not_send: PhantomData<*const ()>,
}

impl ThreadFiber {
    /// Context of the calling thread (same identity on every call)
    pub fn current() -> Self {
        Self {
            unparker: CURRENT.with(Arc::clone),
            _not_send: PhantomData,
        }
    }
}

impl FiberContext for ThreadFiber {
    fn id(&self) -> FiberId {
        self.unparker.fiber
    }

    fn waker(&self) -> Waker {
        Waker::from(self.unparker.clone())
    }

    fn suspend(&self) {
        let parker = &self.unparker.parker;
        if let Err(err) = parker.park() {
            tracing::warn!(
                fiber = self.unparker.fiber.as_u64(),
                %err,
                "kernel park failed, falling back to spinning"
            );
            parker.park_spinning();
        }
    }
}
