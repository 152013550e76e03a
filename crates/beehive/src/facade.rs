//! The client-facing surface: typed scheduling plus `for_each`/`transform`
//! fan-out helpers built on top of [`crate::pool::Pool`]. See spec.md §4.9.

use crate::config::PoolConfig;
use crate::error::BeehiveError;
use crate::pool::Pool;
use crate::task::{Priority, DEFAULT_PRIORITY};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// A typed, single-consumer handle to a scheduled callable's return value.
/// Unlike [`crate::task::CompletionHandle`] (which every worker and waiter
/// shares), a `TaskFuture` is meant to be waited on once, by the caller that
/// scheduled it, which is why [`wait`](Self::wait) consumes it.
pub struct TaskFuture<R> {
    completion: crate::task::CompletionHandle,
    result: Arc<Mutex<Option<R>>>,
}

impl<R> TaskFuture<R> {
    /// Non-blocking: has the underlying task finished?
    pub fn is_ready(&self) -> bool {
        self.completion.is_ready()
    }

    /// Blocks until the task completes, then returns its result or the
    /// reason it never produced one.
    pub fn wait(self) -> Result<R, BeehiveError> {
        self.completion.wait()?;
        Ok(self
            .result
            .lock()
            .take()
            .expect("a completion handle resolved Ok(()) without storing a result"))
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Option<Result<R, BeehiveError>> {
        match self.completion.wait_timeout(timeout)? {
            Ok(()) => Some(Ok(self
                .result
                .lock()
                .take()
                .expect("a completion handle resolved Ok(()) without storing a result"))),
            Err(err) => Some(Err(err)),
        }
    }
}

/// A thread pool with a typed, closure-based scheduling surface, built on
/// top of the untyped [`Pool`]. This is the type most callers reach for;
/// [`Pool`] itself stays available for callers that only need the void,
/// fire-and-observe-completion form.
pub struct Beehive {
    pool: Pool,
}

impl Beehive {
    pub fn new(config: PoolConfig) -> Self {
        Self { pool: Pool::new(config) }
    }

    pub fn new_with_workers(workers: usize) -> Self {
        Self {
            pool: Pool::new_with_workers(workers),
        }
    }

    /// The underlying untyped pool, for callers that need `Pool`-level
    /// operations ([`Pool::worker`], [`Pool::dump`], [`Pool::stats`], ...)
    /// not exposed directly through this façade.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Schedules `f` at the default priority and returns a typed future for
    /// its result. Arguments that the original call site wants to pass
    /// through are simply captured by `f`'s closure, the idiomatic Rust
    /// equivalent of the `schedule(fn, args...)` forwarding this façade is
    /// modeled on.
    pub fn schedule<F, R>(&self, f: F) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.schedule_with_priority(f, DEFAULT_PRIORITY)
    }

    /// Like [`schedule`](Self::schedule), at an explicit priority.
    pub fn schedule_with_priority<F, R>(&self, f: F, priority: Priority) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let result: Arc<Mutex<Option<R>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&result);
        let completion = self.pool.schedule(
            move || {
                let value = f();
                *slot.lock() = Some(value);
            },
            priority,
        );
        TaskFuture { completion, result }
    }

    /// Schedules `f(item)` for every `item`, then waits for all of them to
    /// finish, in input order. Returns the first error encountered (if
    /// any), after every task has still been given a chance to run.
    pub fn for_each<T, F>(&self, items: impl IntoIterator<Item = T>, f: F) -> Result<(), BeehiveError>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let f = Arc::clone(&f);
                self.pool.schedule(move || f(item), DEFAULT_PRIORITY)
            })
            .collect();

        let mut first_error = None;
        for handle in handles {
            if let Err(err) = handle.wait() {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Schedules `f(item)` for every `item`, then polls the resulting
    /// futures in a loop (non-blocking, via [`TaskFuture::is_ready`]) and
    /// collects each value as it becomes ready. Output order follows
    /// **completion order**, not input order — a faster worker finishing a
    /// later item can overtake a slower one still working on an earlier
    /// item. Callers that need input order should pair each item with its
    /// index before calling and sort afterward.
    ///
    /// If any `f(item)` panics or its task is abandoned, the first such
    /// error is returned once every item has been accounted for (either
    /// collected or resolved to an error) — a panicking item can never
    /// leave this waiting forever the way a plain completion-count check
    /// would.
    pub fn transform<T, R, F>(&self, items: impl IntoIterator<Item = T>, f: F) -> Result<Vec<R>, BeehiveError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let mut pending: Vec<Option<TaskFuture<R>>> = items
            .into_iter()
            .map(|item| {
                let f = Arc::clone(&f);
                Some(self.schedule_with_priority(move || f(item), DEFAULT_PRIORITY))
            })
            .collect();

        let mut results = Vec::with_capacity(pending.len());
        let mut first_error = None;
        let mut outstanding = pending.len();

        while outstanding > 0 {
            let mut made_progress = false;
            for slot in pending.iter_mut() {
                let is_ready = match slot {
                    Some(future) => future.is_ready(),
                    None => continue,
                };
                if !is_ready {
                    continue;
                }
                let future = slot.take().expect("checked Some above");
                outstanding -= 1;
                made_progress = true;
                match future.wait() {
                    Ok(value) => results.push(value),
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }
            if !made_progress && outstanding > 0 {
                std::thread::yield_now();
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }
}
