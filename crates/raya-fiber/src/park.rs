//! One-permit thread parker for idle worker threads
//!
//! A worker that runs out of fibers parks its OS thread here instead of
//! sleeping in a poll loop; whoever makes work available calls
//! [`Parker::unpark`]. The permit is sticky: an `unpark` that lands before
//! the matching `park` makes that `park` return immediately.

use crate::futex::{self, FutexResult};
use crossbeam::utils::Backoff;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

const EMPTY: u32 = 0;
const NOTIFIED: u32 = 1;
const PARKED: u32 = 2;

/// Parker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkerOptions {
    /// Backoff rounds to spin on the permit before sleeping in the kernel
    /// (0 = sleep straight away)
    pub spin_rounds: u32,
}

impl ParkerOptions {
    /// Never spin; every `park` without a pending permit goes to the kernel
    pub fn no_spin() -> Self {
        Self { spin_rounds: 0 }
    }
}

impl Default for ParkerOptions {
    fn default() -> Self {
        Self { spin_rounds: 10 }
    }
}

/// Futex-backed park/unpark token
#[derive(Debug)]
pub struct Parker {
    /// EMPTY, NOTIFIED or PARKED
    state: AtomicU32,
    options: ParkerOptions,
}

impl Parker {
    /// Create a parker with no pending permit
    pub fn new() -> Self {
        Self::with_options(ParkerOptions::default())
    }

    /// Create a parker with explicit tuning
    pub fn with_options(options: ParkerOptions) -> Self {
        Self {
            state: AtomicU32::new(EMPTY),
            options,
        }
    }

    /// Tuning in effect
    pub fn options(&self) -> ParkerOptions {
        self.options
    }

    /// Whether a permit is waiting to be consumed
    pub fn is_notified(&self) -> bool {
        self.state.load(Ordering::Acquire) == NOTIFIED
    }

    /// Consume the permit, sleeping until one is posted.
    ///
    /// Only the thread owning the parker may call this. On `Err` the
    /// primitive is unusable and no permit was consumed; the caller decides
    /// whether to fall back to [`park_spinning`](Self::park_spinning).
    pub fn park(&self) -> FutexResult<()> {
        if self.try_consume() {
            return Ok(());
        }

        let backoff = Backoff::new();
        for _ in 0..self.options.spin_rounds {
            backoff.snooze();
            if self.try_consume() {
                return Ok(());
            }
        }

        // An earlier failed park may have left the state at PARKED.
        match self
            .state
            .compare_exchange(EMPTY, PARKED, Ordering::Acquire, Ordering::Acquire)
        {
            Ok(_) | Err(PARKED) => {}
            Err(_) => {
                // Permit posted since the last check.
                self.state.store(EMPTY, Ordering::Release);
                return Ok(());
            }
        }

        loop {
            futex::wait(&self.state, PARKED)?;
            if self.try_consume() {
                return Ok(());
            }
            tracing::trace!("parker woke without a permit");
        }
    }

    /// Consume the permit by yielding the OS thread until one is posted.
    ///
    /// Never touches the kernel wait primitive.
    pub fn park_spinning(&self) {
        let backoff = Backoff::new();
        while !self.try_consume() {
            if backoff.is_completed() {
                thread::yield_now();
            } else {
                backoff.snooze();
            }
        }
    }

    /// Post the permit, waking the owning thread if it is asleep.
    ///
    /// The permit is recorded even when the kernel wake fails.
    pub fn unpark(&self) -> FutexResult<()> {
        if self.state.swap(NOTIFIED, Ordering::Release) == PARKED {
            futex::wake(&self.state)?;
        }
        Ok(())
    }

    fn try_consume(&self) -> bool {
        self.state
            .compare_exchange(NOTIFIED, EMPTY, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for Parker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_permit_before_park() {
        let parker = Parker::new();
        parker.unpark().unwrap();
        assert!(parker.is_notified());

        parker.park().unwrap();
        assert!(!parker.is_notified());
    }

    #[test]
    fn test_permits_do_not_accumulate() {
        let parker = Parker::with_options(ParkerOptions::no_spin());
        parker.unpark().unwrap();
        parker.unpark().unwrap();
        parker.park().unwrap();
        assert!(!parker.is_notified());
    }

    #[test]
    fn test_unpark_from_other_thread() {
        let parker = Arc::new(Parker::with_options(ParkerOptions::no_spin()));
        let woke = Arc::new(AtomicBool::new(false));

        let sleeper = {
            let parker = parker.clone();
            let woke = woke.clone();
            thread::spawn(move || {
                parker.park().unwrap();
                woke.store(true, Ordering::Release);
            })
        };

        thread::sleep(Duration::from_millis(20));
        parker.unpark().unwrap();
        sleeper.join().unwrap();
        assert!(woke.load(Ordering::Acquire));
    }

    #[test]
    fn test_park_spinning_consumes_permit() {
        let parker = Arc::new(Parker::new());
        let poster = {
            let parker = parker.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                parker.unpark().unwrap();
            })
        };

        parker.park_spinning();
        poster.join().unwrap();
        assert!(!parker.is_notified());
    }

    #[test]
    fn test_options_default() {
        assert_eq!(Parker::new().options(), ParkerOptions::default());
        assert_eq!(ParkerOptions::no_spin().spin_rounds, 0);
    }
}
