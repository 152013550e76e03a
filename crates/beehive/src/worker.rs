//! A single OS thread that consumes control messages and, on `TASK`, pulls
//! and runs one [`Task`](crate::task::Task) from its parent pool's queue.

use crate::message::{Handler, HandlerResult, Message, SignalingQueue};
use crate::pool::PoolShared;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crate::time_counter::TimeCounter;

#[cfg(unix)]
use std::os::unix::thread::JoinHandleExt;

/// A snapshot of one worker's counters (spec.md §3, `Worker.Stats`).
/// `runs <= messages`; `idle + active` approximates wall-clock time since
/// the worker started, modulo measurement granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub messages: u64,
    pub runs: u64,
    pub idle: Duration,
    pub active: Duration,
}

#[derive(Debug, Default)]
struct AtomicStats {
    messages: AtomicU64,
    runs: AtomicU64,
    idle: TimeCounter,
    active: TimeCounter,
}

impl AtomicStats {
    fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> Stats {
        Stats {
            messages: self.messages.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
            idle: self.idle.value(),
            active: self.active.value(),
        }
    }
}

#[derive(Debug)]
struct Identity {
    id: usize,
    thread_id: ThreadId,
    native_handle: beehive_platform::NativeHandle,
    name: Mutex<String>,
}

/// One OS thread owned by a [`crate::pool::Pool`]. Maintains its own
/// [`Stats`] and can be pinned/renamed through the
/// [`beehive_platform`](beehive_platform) capability port.
pub(crate) struct Worker {
    identity: Arc<Identity>,
    stats: Arc<AtomicStats>,
    queue: Arc<SignalingQueue>,
    join_handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Registers with the parent pool at the given stable `id`, assigns the
    /// default name `worker[<id>]`, and spawns the work thread.
    pub(crate) fn spawn(id: usize, pool: Arc<PoolShared>, signal_wait: Duration) -> Self {
        let default_name = format!("worker[{id}]");
        let queue = Arc::new(SignalingQueue::new(signal_wait));
        let stats = Arc::new(AtomicStats::default());

        let thread_queue = Arc::clone(&queue);
        let thread_stats = Arc::clone(&stats);
        let thread_pool = Arc::clone(&pool);
        let thread_name = default_name.clone();

        let join_handle = thread::Builder::new()
            .name(default_name.clone())
            .spawn(move || worker_loop(id, &thread_pool, &thread_stats, &thread_queue, &thread_name))
            .expect("failed to spawn beehive worker thread");

        let thread_id = join_handle.thread().id();
        let native_handle = native_handle_of(&join_handle);
        beehive_platform::set_name(native_handle, &default_name);

        Self {
            identity: Arc::new(Identity {
                id,
                thread_id,
                native_handle,
                name: Mutex::new(default_name),
            }),
            stats,
            queue,
            join_handle: Some(join_handle),
        }
    }

    pub(crate) fn send_task(&self) {
        self.queue.send(Message::Task);
    }

    pub(crate) fn send_dump(&self) {
        self.queue.send(Message::Dump);
    }

    pub(crate) fn stats(&self) -> Stats {
        self.stats.load()
    }

    pub(crate) fn view(&self) -> WorkerView {
        WorkerView {
            identity: Some(Arc::clone(&self.identity)),
            stats: Some(Arc::clone(&self.stats)),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // `EXIT` is only dispatched after every message already queued
        // ahead of it, so NOP/TASK/DUMP sent before this point are drained
        // before the thread actually exits.
        self.queue.send(Message::Exit);
        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                beehive_log::error!("worker thread failed to join cleanly");
            }
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker").field("id", &self.identity.id).finish()
    }
}

#[cfg(unix)]
fn native_handle_of(join_handle: &JoinHandle<()>) -> beehive_platform::NativeHandle {
    join_handle.as_pthread_t()
}

#[cfg(not(unix))]
fn native_handle_of(_join_handle: &JoinHandle<()>) -> beehive_platform::NativeHandle {
    0
}

/// The worker's own [`Handler`] implementation: before/after hooks move
/// time between the idle and active counters, and `on_task` claims at most
/// one [`Task`](crate::task::Task) from the pool's queue per `TASK` message.
struct WorkerHandler<'a> {
    pool: &'a PoolShared,
    stats: &'a AtomicStats,
    name: &'a str,
}

impl Handler for WorkerHandler<'_> {
    fn on_before_message(&mut self) {
        self.stats.idle.stop();
        self.stats.active.start();
        self.stats.record_message();
    }

    fn on_after_message(&mut self) {
        self.stats.active.stop();
        self.stats.idle.start();
    }

    fn on_nop(&mut self) -> HandlerResult {
        HandlerResult::Continue
    }

    fn on_exit(&mut self) -> HandlerResult {
        HandlerResult::Finish
    }

    fn on_task(&mut self) -> HandlerResult {
        // A `TASK` message with nothing left to pop is a legal "surplus"
        // notification: some peer worker already drained the queue.
        if let Some(task) = self.pool.try_claim_task() {
            self.stats.record_run();
            beehive_log::with_trace_timing!("worker {} ran a task", self.name; task.run());
        }
        HandlerResult::Continue
    }

    fn on_dump(&mut self) -> HandlerResult {
        dump_snapshot(self.name, self.stats.load());
        HandlerResult::Continue
    }
}

static DUMP_MUTEX: Mutex<()> = Mutex::new(());

fn dump_snapshot(name: &str, stats: Stats) {
    let _guard = DUMP_MUTEX.lock();
    beehive_log::info!(
        "Thread: {name}\nNumber of tasks ran: {}\nNumber of messages processed: {}\nTime active: {} milliseconds\nTime idle: {} milliseconds",
        stats.runs,
        stats.messages,
        stats.active.as_millis(),
        stats.idle.as_millis(),
    );
}

fn worker_loop(
    id: usize,
    pool: &Arc<PoolShared>,
    stats: &Arc<AtomicStats>,
    queue: &Arc<SignalingQueue>,
    name: &str,
) {
    beehive_log::trace!("worker {id} started");
    stats.idle.start();
    let mut handler = WorkerHandler { pool, stats, name };
    queue.run(&mut handler);
    beehive_log::trace!("worker {id} exiting");
}

/// A non-owning handle to a [`Worker`], safe to copy and valid only while
/// the owning [`crate::pool::Pool`] is alive. [`Pool::worker`] returns an
/// empty view (`is_valid() == false`) for an out-of-range index instead of
/// panicking or returning an `Option`, matching spec.md §7's "sentinel
/// empty View" policy.
#[derive(Debug, Clone)]
pub struct WorkerView {
    identity: Option<Arc<Identity>>,
    stats: Option<Arc<AtomicStats>>,
}

impl WorkerView {
    pub(crate) fn empty() -> Self {
        Self {
            identity: None,
            stats: None,
        }
    }

    /// `false` for a view obtained from an out-of-range [`Pool::worker`]
    /// index; `true` otherwise.
    pub fn is_valid(&self) -> bool {
        self.identity.is_some()
    }

    pub fn id(&self) -> Option<usize> {
        self.identity.as_ref().map(|identity| identity.id)
    }

    pub fn thread_id(&self) -> Option<ThreadId> {
        self.identity.as_ref().map(|identity| identity.thread_id)
    }

    pub fn native_handle(&self) -> Option<beehive_platform::NativeHandle> {
        self.identity.as_ref().map(|identity| identity.native_handle)
    }

    pub fn name(&self) -> Option<String> {
        self.identity.as_ref().map(|identity| identity.name.lock().clone())
    }

    pub fn set_name(&self, name: &str) {
        if let Some(identity) = &self.identity {
            beehive_platform::set_name(identity.native_handle, name);
            *identity.name.lock() = name.to_string();
        }
    }

    pub fn affinity(&self) -> Vec<bool> {
        self.identity
            .as_ref()
            .map(|identity| beehive_platform::get_affinity(identity.native_handle))
            .unwrap_or_default()
    }

    pub fn set_affinity(&self, mask: &[bool]) {
        if let Some(identity) = &self.identity {
            beehive_platform::set_affinity(identity.native_handle, mask);
        }
    }

    pub fn stats(&self) -> Option<Stats> {
        self.stats.as_ref().map(|stats| stats.load())
    }
}
