use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};

/// Source of time for every wait in the lock.
///
/// All actuation timing, debounce delays and the loop cadence go through this, so the control
/// logic can run against a virtual clock.
pub trait Clock: Debug {
    fn now(&self) -> Instant;

    /// Blocks for the given duration.
    fn sleep(&self, duration: Duration);
}

/// The wall clock.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}
