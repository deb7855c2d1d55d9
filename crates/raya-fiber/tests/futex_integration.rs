//! Integration tests for word-wait and the idle thread parker

use raya_fiber::futex;
use raya_fiber::{Parker, ParkerOptions};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn test_word_wait_round_trip() {
    let word = Arc::new(AtomicU32::new(0));
    let (done_tx, done_rx) = mpsc::channel();

    {
        let word = word.clone();
        thread::spawn(move || {
            while word.load(Ordering::Acquire) == 0 {
                futex::wait(&word, 0).unwrap();
            }
            done_tx.send(()).unwrap();
        });
    }

    thread::sleep(Duration::from_millis(10));
    word.store(1, Ordering::Release);
    futex::wake(&word).unwrap();

    done_rx
        .recv_timeout(TIMEOUT)
        .expect("waiter never returned from wait");
}

#[test]
fn test_generation_counter_wakeups() {
    // Waiter follows a generation counter the way an idle worker would.
    const ROUNDS: u32 = 200;

    let generation = Arc::new(AtomicU32::new(0));
    let (done_tx, done_rx) = mpsc::channel();

    {
        let generation = generation.clone();
        thread::spawn(move || {
            let mut seen = 0;
            while seen < ROUNDS {
                let current = generation.load(Ordering::Acquire);
                if current == seen {
                    futex::wait(&generation, seen).unwrap();
                } else {
                    seen = current;
                }
            }
            done_tx.send(seen).unwrap();
        });
    }

    for _ in 0..ROUNDS {
        generation.fetch_add(1, Ordering::Release);
        futex::wake(&generation).unwrap();
    }

    assert_eq!(done_rx.recv_timeout(TIMEOUT).unwrap(), ROUNDS);
}

#[test]
fn test_parker_ping_pong() {
    const ROUNDS: usize = 500;

    let ping = Arc::new(Parker::with_options(ParkerOptions::no_spin()));
    let pong = Arc::new(Parker::new());
    let (done_tx, done_rx) = mpsc::channel();

    {
        let ping = ping.clone();
        let pong = pong.clone();
        thread::spawn(move || {
            for _ in 0..ROUNDS {
                ping.park().unwrap();
                pong.unpark().unwrap();
            }
            done_tx.send(()).unwrap();
        });
    }

    for _ in 0..ROUNDS {
        ping.unpark().unwrap();
        pong.park().unwrap();
    }

    done_rx.recv_timeout(TIMEOUT).unwrap();
    assert!(!ping.is_notified());
    assert!(!pong.is_notified());
}
