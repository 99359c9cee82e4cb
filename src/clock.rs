//! A small seam over "now", so timeouts can be tested without sleeping in real time.
//!
//! The original engine reads the wall clock directly wherever a timeout is armed or checked.
//! `SystemClock` preserves that behaviour for production use; `ManualClock` lets a test harness
//! advance time instantly instead.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Anything that can report "now".
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Backed by `std::time::Instant`. What a deployed node uses.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock a test harness advances explicitly. Starts at an arbitrary fixed instant and only
/// moves forward when `advance` is called.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_on_advance() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), t0 + Duration::from_secs(5));
    }

    #[test]
    fn cloned_manual_clocks_share_time() {
        let clock = ManualClock::new();
        let clone = clock.clone();
        clock.advance(Duration::from_secs(1));
        assert_eq!(clone.now(), clock.now());
    }
}
