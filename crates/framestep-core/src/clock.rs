//! Monotonic clocks.
//!
//! Timing-sensitive code (timers, frame-rate sampling) reads time through the
//! [`Clock`] trait so that hosts can supply the real clock and tests can step
//! time by hand.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A monotonic time source.
///
/// `now()` returns the time elapsed since an arbitrary, fixed origin. Values
/// never decrease.
pub trait Clock: Send + Sync {
    /// Current monotonic time since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock monotonic time backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Create a manual clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Jump to an absolute time. Requests to move backwards are ignored.
    pub fn set(&self, to: Duration) {
        let mut now = self.now.lock();
        if to > *now {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}
