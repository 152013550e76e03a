//! Process-wide at-most-once filter for string-keyed effects.

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

/// A synchronized string set providing the linearizable test-and-set that
/// tasks use to enforce at-most-once effects even when the same logical
/// work item has been scheduled redundantly (e.g. by more than one
/// producer racing to enqueue it).
#[derive(Debug, Default)]
pub struct IdempotencySet {
    seen: Mutex<FxHashSet<String>>,
}

impl IdempotencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically tests whether `id` has been seen before and, if not,
    /// records it. Returns `true` exactly once per distinct `id` across the
    /// lifetime of this set, regardless of how many threads call
    /// concurrently with the same `id`.
    pub fn needs_run(&self, id: impl Into<String>) -> bool {
        self.seen.lock().insert(id.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn second_call_with_same_key_returns_false() {
        let set = IdempotencySet::new();
        assert!(set.needs_run("k1"));
        assert!(!set.needs_run("k1"));
        assert!(!set.needs_run("k1"));
    }

    #[test]
    fn distinct_keys_are_independent() {
        let set = IdempotencySet::new();
        assert!(set.needs_run("a"));
        assert!(set.needs_run("b"));
    }

    #[test]
    fn exactly_one_concurrent_caller_wins_per_key() {
        let set = Arc::new(IdempotencySet::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let set = Arc::clone(&set);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if set.needs_run("contested") {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
