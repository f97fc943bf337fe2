//! Program uptime and fixed-rate loop timing.

use std::{
    sync::OnceLock,
    thread,
    time::{Duration, Instant},
};

use log::warn;

/// The nominal period between two control steps.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(20);

static PROGRAM_START: OnceLock<Instant> = OnceLock::new();

/// Returns the time elapsed since the program first asked for it.
///
/// The first call anchors the clock, so call this early (the logger does).
pub fn uptime() -> Duration {
    PROGRAM_START.get_or_init(Instant::now).elapsed()
}

/// A fixed-rate timer for the control loop.
///
/// Each [`wait`](Self::wait) sleeps until the next deadline. If a step took
/// longer than one period, the overrun is logged and the schedule is re-anchored
/// to the current time rather than running several steps back to back.
#[derive(Debug)]
pub struct PeriodicTimer {
    period: Duration,
    next_deadline: Instant,
    paced: bool,
    ticks: u64,
    overruns: u64,
}

impl PeriodicTimer {
    /// Creates a timer that sleeps between ticks.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_deadline: Instant::now() + period,
            paced: true,
            ticks: 0,
            overruns: 0,
        }
    }

    /// Creates a timer that never sleeps, for simulation faster than real time.
    #[must_use]
    pub fn unpaced(period: Duration) -> Self {
        Self {
            paced: false,
            ..Self::new(period)
        }
    }

    /// The period between ticks.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Number of completed waits.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of ticks whose deadline had already passed when waited on.
    #[must_use]
    pub const fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Blocks until the next deadline.
    pub fn wait(&mut self) {
        self.ticks += 1;
        if !self.paced {
            return;
        }

        let now = Instant::now();
        if let Some(remaining) = self.next_deadline.checked_duration_since(now) {
            thread::sleep(remaining);
            self.next_deadline += self.period;
        } else {
            self.overruns += 1;
            warn!(
                "Loop time of {:?} overrun by {:?}",
                self.period,
                now - self.next_deadline
            );
            self.next_deadline = now + self.period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaced_timer_counts_without_sleeping() {
        let mut timer = PeriodicTimer::unpaced(Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..5 {
            timer.wait();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(timer.ticks(), 5);
        assert_eq!(timer.overruns(), 0);
    }

    #[test]
    fn paced_timer_reports_overrun() {
        let mut timer = PeriodicTimer::new(Duration::from_millis(1));
        thread::sleep(Duration::from_millis(5));
        timer.wait();
        assert_eq!(timer.overruns(), 1);

        timer.wait();
        assert_eq!(timer.ticks(), 2);
    }

    #[test]
    fn uptime_is_monotonic() {
        let first = uptime();
        let second = uptime();
        assert!(second >= first);
    }
}
