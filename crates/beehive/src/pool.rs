//! The scheduler itself: a priority queue of [`Task`](crate::task::Task)s
//! shared by a set of [`Worker`](crate::worker::Worker)s.

use crate::config::PoolConfig;
use crate::idempotency::IdempotencySet;
use crate::pq::{Order, PriorityQueue};
use crate::task::{Priority, Task};
use crate::worker::{Stats, Worker, WorkerView};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// State shared between a [`Pool`] and every [`Worker`] it owns. Kept
/// separate from `Pool` itself (rather than having each `Worker` hold a
/// back-reference to its `Pool`) so that dropping a `Pool` does not have to
/// unwind a reference cycle.
pub(crate) struct PoolShared {
    queue: PriorityQueue<Priority, Task>,
    idempotency: IdempotencySet,
}

impl PoolShared {
    /// Claims at most one queued task. Called by a worker in response to a
    /// `TASK` message; may legitimately return `None` if a sibling worker
    /// already claimed the only task that was queued.
    pub(crate) fn try_claim_task(&self) -> Option<Task> {
        self.queue.try_pop().map(|(_priority, task)| task)
    }
}

/// A thread pool: schedules [`Task`]s by priority across a fixed set of
/// [`Worker`]s. See spec.md §4.8.
pub struct Pool {
    shared: Arc<PoolShared>,
    workers: RwLock<Vec<Worker>>,
    signal_wait: Duration,
    dump_on_drop: bool,
}

impl Pool {
    /// Builds a pool per `config`. `config.workers == 0` resolves to
    /// [`beehive_platform::num_processors`].
    pub fn new(config: PoolConfig) -> Self {
        let worker_count = if config.workers == 0 {
            beehive_platform::num_processors()
        } else {
            config.workers
        };

        let shared = Arc::new(PoolShared {
            queue: PriorityQueue::new(Order::MaxFirst),
            idempotency: IdempotencySet::new(),
        });

        let workers = (0..worker_count)
            .map(|id| Worker::spawn(id, Arc::clone(&shared), config.signal_wait))
            .collect();

        Self {
            shared,
            workers: RwLock::new(workers),
            signal_wait: config.signal_wait,
            dump_on_drop: config.dump_on_drop,
        }
    }

    /// Convenience constructor for the common case of a fixed worker count
    /// with otherwise-default configuration.
    pub fn new_with_workers(workers: usize) -> Self {
        Self::new(PoolConfig {
            workers,
            ..PoolConfig::default()
        })
    }

    /// Queues `callable` at `priority` and returns a handle to observe its
    /// completion. Every worker is notified; exactly one of them will claim
    /// and run the task.
    pub fn schedule<F>(&self, callable: F, priority: Priority) -> crate::task::CompletionHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let (task, handle) = Task::new(callable);
        self.shared.queue.push(priority, task);
        for worker in self.workers.read().iter() {
            worker.send_task();
        }
        handle
    }

    /// Claims at most one queued task, without blocking. Exposed alongside
    /// [`Worker`]'s own use of the same operation so a caller driving its
    /// own dispatch loop (e.g. in a test) can observe the same semantics.
    pub fn task(&self) -> Option<Task> {
        self.shared.try_claim_task()
    }

    /// `true` if the priority queue currently holds no task. Workers that
    /// are mid-run are not reflected here; this only reports the queue.
    pub fn idle(&self) -> bool {
        self.shared.queue.empty()
    }

    /// Appends one more worker, started with this pool's configured signal
    /// wait granularity. Safe to call concurrently with [`schedule`](Self::schedule).
    pub fn add_worker(&self) {
        let mut workers = self.workers.write();
        let id = workers.len();
        workers.push(Worker::spawn(id, Arc::clone(&self.shared), self.signal_wait));
    }

    /// Number of workers currently owned by this pool.
    pub fn size(&self) -> usize {
        self.workers.read().len()
    }

    /// A snapshot of every worker's counters, in worker-id order.
    pub fn stats(&self) -> Vec<Stats> {
        self.workers.read().iter().map(Worker::stats).collect()
    }

    /// A non-owning handle to the worker at `index`. Returns an empty view
    /// (`WorkerView::is_valid() == false`) if `index` is out of range,
    /// rather than panicking.
    pub fn worker(&self, index: usize) -> WorkerView {
        self.workers
            .read()
            .get(index)
            .map(Worker::view)
            .unwrap_or_else(WorkerView::empty)
    }

    /// Asks every worker to emit a diagnostic snapshot via `beehive-log`.
    pub fn dump(&self) {
        for worker in self.workers.read().iter() {
            worker.send_dump();
        }
    }

    /// The pool-wide idempotency filter backing `needs_run`-style at-most-once
    /// effects inside scheduled callables.
    pub fn idempotency(&self) -> &IdempotencySet {
        &self.shared.idempotency
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if self.dump_on_drop {
            self.dump();
        }
        // Workers are dropped here (as the `workers` field goes out of
        // scope right after this runs), each sending itself one `EXIT` and
        // joining. Any task still sitting in the queue at this point is
        // simply dropped, abandoning its `CompletionHandle`.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    #[test]
    fn schedule_runs_on_a_single_worker_pool() {
        let pool = Pool::new_with_workers(1);
        let handle = pool.schedule(|| {}, crate::task::DEFAULT_PRIORITY);
        assert_eq!(handle.wait(), Ok(()));
    }

    #[test]
    fn add_worker_increases_size() {
        let pool = Pool::new_with_workers(1);
        assert_eq!(pool.size(), 1);
        pool.add_worker();
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn worker_out_of_range_returns_empty_view() {
        let pool = Pool::new_with_workers(1);
        assert!(pool.worker(0).is_valid());
        assert!(!pool.worker(99).is_valid());
    }

    #[test]
    fn dropping_pool_abandons_queued_tasks() {
        let pool = Pool::new(PoolConfig {
            workers: 1,
            signal_wait: Duration::from_millis(1),
            dump_on_drop: false,
        });
        let handle = pool.schedule(|| {}, crate::task::MAX_PRIORITY);
        drop(pool);
        // Either it ran before the pool dropped, or it was abandoned — both
        // are terminal outcomes, neither hangs.
        let outcome = handle.wait();
        assert!(outcome.is_ok() || outcome == Err(crate::error::BeehiveError::Abandoned));
    }

    #[test]
    fn stats_report_one_entry_per_worker() {
        let pool = Pool::new_with_workers(3);
        let stats = pool.stats();
        assert_eq!(stats.len(), 3);
        for s in stats {
            assert_eq!(s.runs, 0);
        }
    }

    #[test]
    fn concurrent_scheduling_runs_every_task_exactly_once() {
        let pool = StdArc::new(Pool::new_with_workers(4));
        let counter = StdArc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..200)
            .map(|_| {
                let counter = StdArc::clone(&counter);
                pool.schedule(
                    move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    },
                    crate::task::DEFAULT_PRIORITY,
                )
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.wait(), Ok(()));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 200);
    }
}
