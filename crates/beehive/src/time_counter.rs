//! Monotonic accumulator of elapsed intervals.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct State {
    running_since: Option<Instant>,
    accumulated: Duration,
}

/// Accumulates wall-clock time across any number of `start`/`stop`
/// intervals. `start` and `stop` are idempotent: a redundant `start` while
/// already running, or a redundant `stop` while already stopped, is a
/// no-op rather than an error or a reset.
#[derive(Debug)]
pub struct TimeCounter {
    state: Mutex<State>,
}

impl TimeCounter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                running_since: None,
                accumulated: Duration::ZERO,
            }),
        }
    }

    /// Begins a new interval, unless one is already running.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.running_since.is_none() {
            state.running_since = Some(Instant::now());
        }
    }

    /// Ends the current interval and folds it into the accumulated total,
    /// unless no interval is currently running.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if let Some(started_at) = state.running_since.take() {
            state.accumulated += started_at.elapsed();
        }
    }

    /// Accumulated duration across all completed intervals. Does not
    /// include an interval that is currently in progress.
    pub fn value(&self) -> Duration {
        self.state.lock().accumulated
    }
}

impl Default for TimeCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn idempotent_double_start_does_not_reset_the_clock() {
        let counter = TimeCounter::new();
        counter.start();
        thread::sleep(Duration::from_millis(100));
        counter.start();
        thread::sleep(Duration::from_millis(100));
        counter.stop();
        assert!(counter.value() >= Duration::from_millis(200));
    }

    #[test]
    fn idempotent_double_stop_does_not_change_the_value() {
        let counter = TimeCounter::new();
        counter.start();
        thread::sleep(Duration::from_millis(100));
        counter.stop();
        let recorded = counter.value();
        thread::sleep(Duration::from_millis(100));
        counter.stop();
        assert_eq!(counter.value(), recorded);
    }

    #[test]
    fn value_excludes_an_in_progress_interval() {
        let counter = TimeCounter::new();
        assert_eq!(counter.value(), Duration::ZERO);
        counter.start();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.value(), Duration::ZERO);
    }
}
