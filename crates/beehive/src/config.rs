//! Pool configuration.

use std::time::Duration;

/// Construction-time parameters for a [`crate::pool::Pool`].
///
/// ```
/// use beehive::PoolConfig;
/// let config = PoolConfig::default();
/// assert_eq!(config.workers, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads. `0` means "one per logical CPU", resolved
    /// via [`beehive_platform::num_processors`] at `Pool::new` time.
    pub workers: usize,
    /// How long a worker's [`crate::message::SignalingQueue::receive`] waits
    /// before re-checking for a new message, absent a wakeup.
    pub signal_wait: Duration,
    /// If `true`, [`crate::pool::Pool::drop`] emits one diagnostic dump per
    /// worker before joining its threads.
    pub dump_on_drop: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            signal_wait: Duration::from_millis(100),
            dump_on_drop: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.workers, 0);
        assert_eq!(config.signal_wait, Duration::from_millis(100));
        assert!(!config.dump_on_drop);
    }
}
