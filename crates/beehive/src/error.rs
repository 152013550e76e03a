//! Error taxonomy (spec.md §7).
//!
//! Most operations in this crate simply cannot fail: an out-of-range
//! `Pool::worker` returns an empty [`crate::worker::WorkerView`], an empty
//! [`crate::pq::PriorityQueue::try_pop`] returns `None`, and a redundant
//! `TimeCounter::start`/`stop` is a no-op. The one place a real error value
//! is needed is a task's completion handle, which must be able to report
//! "the callable panicked" or "this task was dropped before it ran"
//! instead of blocking its waiters forever.

use std::fmt;

/// Errors observable through a [`crate::task::CompletionHandle`] or a
/// façade [`crate::facade::TaskFuture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeehiveError {
    /// The task's callable unwound via `panic!` instead of returning.
    TaskPanicked,
    /// The task was dropped (e.g. the owning [`crate::pool::Pool`] was
    /// destroyed) before a worker ever picked it up and ran it.
    Abandoned,
    /// Reserved for a future cooperative-shutdown signal. Not reachable
    /// today: `Pool` has no shutdown flag, and task cancellation once
    /// dispatched is out of scope. Kept for API symmetry with a pool that
    /// rejects new work while draining.
    PoolShuttingDown,
}

impl fmt::Display for BeehiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskPanicked => write!(f, "task callable panicked"),
            Self::Abandoned => write!(f, "task was dropped before it ran"),
            Self::PoolShuttingDown => write!(f, "pool is shutting down"),
        }
    }
}

impl std::error::Error for BeehiveError {}
