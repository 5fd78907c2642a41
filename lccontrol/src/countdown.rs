//! Budgeted polling loop.

use std::cell::Cell;
use std::time::{Duration, Instant};

use tracing::trace;

/// Time source for polling loops.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Horloge manuelle pour les tests : `sleep` avance le temps sans attendre.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Iterates while the budget lasts, yielding the time left.
///
/// The first iteration is immediate; each later one sleeps `interval`
/// first. Time spent by the caller between iterations is charged to the
/// budget. An iteration that would start at or past the deadline is not
/// slept for: the loop ends as soon as the budget cannot fit one more
/// interval.
pub struct Countdown<'c, C: Clock> {
    clock: &'c C,
    timeout: Duration,
    interval: Duration,
    start: Option<Instant>,
}

impl<'c, C: Clock> Countdown<'c, C> {
    pub fn new(clock: &'c C, timeout: Duration, interval: Duration) -> Self {
        Self {
            clock,
            timeout,
            interval,
            start: None,
        }
    }

    /// Budget left, starting the clock on first call.
    pub fn remaining(&mut self) -> Duration {
        let start = *self.start.get_or_insert_with(|| self.clock.now());
        self.timeout
            .saturating_sub(self.clock.now().saturating_duration_since(start))
    }
}

impl<C: Clock> Iterator for Countdown<'_, C> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let first = self.start.is_none();
        let remaining = self.remaining();
        if remaining.is_zero() {
            return None;
        }
        if first {
            return Some(remaining);
        }

        if remaining <= self.interval {
            trace!(?remaining, "Deadline reached before next iteration");
            return None;
        }

        trace!(interval = ?self.interval, "Sleeping");
        self.clock.sleep(self.interval);

        let remaining = self.remaining();
        (!remaining.is_zero()).then_some(remaining)
    }
}
