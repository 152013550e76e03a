//! A nullary unit of work and its one-shot completion signal.

use crate::error::BeehiveError;
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// An 8-bit dispatch rank. Higher values dispatch first.
pub type Priority = u8;

/// Lowest dispatch priority.
pub const MIN_PRIORITY: Priority = 0;
/// The priority [`crate::pool::Pool::schedule`] uses unless told otherwise.
pub const DEFAULT_PRIORITY: Priority = 127;
/// Highest dispatch priority.
pub const MAX_PRIORITY: Priority = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending,
    Ready,
    Panicked,
    Abandoned,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
    condvar: Condvar,
}

impl Shared {
    fn set(&self, slot: Slot) {
        let mut guard = self.slot.lock();
        *guard = slot;
        self.condvar.notify_all();
    }
}

fn outcome(slot: Slot) -> Result<(), BeehiveError> {
    match slot {
        Slot::Pending => unreachable!("outcome() called while still pending"),
        Slot::Ready => Ok(()),
        Slot::Panicked => Err(BeehiveError::TaskPanicked),
        Slot::Abandoned => Err(BeehiveError::Abandoned),
    }
}

/// A cloneable, multi-consumer handle to a [`Task`]'s completion. Any number
/// of readers may wait on the same handle concurrently.
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    shared: Arc<Shared>,
}

impl CompletionHandle {
    /// Non-blocking check: has the task finished (successfully, by
    /// panicking, or by being abandoned)?
    pub fn is_ready(&self) -> bool {
        !matches!(*self.shared.slot.lock(), Slot::Pending)
    }

    /// Blocks the calling thread until the task completes, then reports how
    /// it completed.
    pub fn wait(&self) -> Result<(), BeehiveError> {
        let mut guard = self.shared.slot.lock();
        while *guard == Slot::Pending {
            self.shared.condvar.wait(&mut guard);
        }
        outcome(*guard)
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout` and returns
    /// `None` if the task still hasn't completed.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<(), BeehiveError>> {
        let mut guard = self.shared.slot.lock();
        if *guard == Slot::Pending {
            let result = self.shared.condvar.wait_for(&mut guard, timeout);
            if result.timed_out() && *guard == Slot::Pending {
                return None;
            }
        }
        Some(outcome(*guard))
    }
}

struct Promise {
    shared: Arc<Shared>,
    fulfilled: bool,
}

impl Promise {
    fn new() -> (Self, CompletionHandle) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::Pending),
            condvar: Condvar::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
                fulfilled: false,
            },
            CompletionHandle { shared },
        )
    }

    fn fulfill(mut self) {
        self.shared.set(Slot::Ready);
        self.fulfilled = true;
    }

    fn report_panic(mut self) {
        self.shared.set(Slot::Panicked);
        self.fulfilled = true;
    }
}

impl Drop for Promise {
    fn drop(&mut self) {
        // A task that is dropped (queued but never popped, or popped but
        // never run) must not leave its waiters blocked forever.
        if !self.fulfilled {
            self.shared.set(Slot::Abandoned);
        }
    }
}

/// A nullary unit of work plus its completion signal. Pushed into a
/// [`crate::pool::Pool`]'s priority queue, claimed by exactly one
/// [`crate::worker::Worker`], and run at most once: the callable is invoked
/// at most once, and the promise is fulfilled exactly once before the task
/// is considered complete.
pub struct Task {
    callable: Option<Box<dyn FnOnce() + Send>>,
    promise: Option<Promise>,
}

impl Task {
    /// Wraps `callable` in a new task and returns it along with a handle to
    /// observe its completion.
    pub fn new<F>(callable: F) -> (Self, CompletionHandle)
    where
        F: FnOnce() + Send + 'static,
    {
        let (promise, handle) = Promise::new();
        (
            Self {
                callable: Some(Box::new(callable)),
                promise: Some(promise),
            },
            handle,
        )
    }

    /// Invokes the callable and fulfills the promise. A panic inside the
    /// callable is caught so it cannot take down the worker thread running
    /// it; the completion handle reports [`BeehiveError::TaskPanicked`]
    /// instead.
    ///
    /// # Panics
    /// If called more than once on the same `Task` (it cannot be, in
    /// practice: `run` takes `self` by value, and a `Task` is dropped
    /// immediately after running).
    pub fn run(mut self) {
        let callable = self.callable.take().expect("Task::run called twice");
        let promise = self.promise.take().expect("Task::run called twice");
        match panic::catch_unwind(AssertUnwindSafe(callable)) {
            Ok(()) => promise.fulfill(),
            Err(_) => promise.report_panic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn run_invokes_callable_and_resolves_future() {
        let count = Arc::new(AtomicUsize::new(0));
        let moved = Arc::clone(&count);
        let (task, handle) = Task::new(move || {
            moved.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!handle.is_ready());
        task.run();
        assert_eq!(handle.wait(), Ok(()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_callable_resolves_to_task_panicked() {
        let (task, handle) = Task::new(|| panic!("boom"));
        task.run();
        assert_eq!(handle.wait(), Err(BeehiveError::TaskPanicked));
    }

    #[test]
    fn dropping_without_running_resolves_to_abandoned() {
        let (task, handle) = Task::new(|| {});
        drop(task);
        assert_eq!(handle.wait(), Err(BeehiveError::Abandoned));
    }

    #[test]
    fn multiple_handles_observe_the_same_completion() {
        let (task, handle) = Task::new(|| {});
        let other = handle.clone();
        task.run();
        assert_eq!(handle.wait(), Ok(()));
        assert_eq!(other.wait(), Ok(()));
    }

    #[test]
    fn wait_timeout_returns_none_while_pending() {
        let (_task, handle) = Task::new(|| {});
        assert_eq!(handle.wait_timeout(Duration::from_millis(10)), None);
    }
}
