// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Monotonic time source used for every interval measurement.
//!
//! Durations are always derived from [`Clock::now`]; wall-clock time only
//! appears as payload metadata. The default clock reads tokio's monotonic
//! instant, which follows the paused test clock when one is active.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

/// Monotonic, nanosecond-resolution time source.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Time elapsed since `start` on this clock.
    fn since(&self, start: Instant) -> Duration {
        self.now().saturating_duration_since(start)
    }
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// The process monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Default shared clock.
pub fn monotonic() -> SharedClock {
    Arc::new(MonotonicClock)
}

/// Timer for measuring individual operations.
pub struct Timer<'a> {
    clock: &'a dyn Clock,
    start: Instant,
}

impl<'a> Timer<'a> {
    /// Start a new timer on `clock`.
    pub fn start(clock: &'a dyn Clock) -> Self {
        Self {
            start: clock.now(),
            clock,
        }
    }

    /// Instant the timer was started at.
    pub fn started_at(&self) -> Instant {
        self.start
    }

    /// Elapsed time so far, timer keeps running.
    pub fn elapsed(&self) -> Duration {
        self.clock.since(self.start)
    }

    /// Stop the timer and return elapsed nanoseconds.
    pub fn stop(self) -> u64 {
        duration_to_nanos(self.elapsed())
    }
}

/// Measure the execution time of a future.
pub async fn measure<F, T>(clock: &dyn Clock, f: F) -> (T, Duration)
where
    F: Future<Output = T>,
{
    let start = clock.now();
    let result = f.await;
    (result, clock.since(start))
}

/// Saturating conversion, a u64 of nanoseconds covers ~584 years.
pub fn duration_to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_follows_paused_clock() {
        let clock = MonotonicClock;
        let timer = Timer::start(&clock);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(timer.stop(), 10_000_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure() {
        let clock = MonotonicClock;
        let (result, duration) = measure(&clock, async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            42
        })
        .await;

        assert_eq!(result, 42);
        assert_eq!(duration, Duration::from_millis(5));
    }

    #[test]
    fn test_manual_clock_only_moves_on_advance() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.since(start), Duration::ZERO);
        clock.advance(Duration::from_micros(7));
        assert_eq!(clock.since(start), Duration::from_micros(7));
    }
}
