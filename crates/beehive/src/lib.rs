//! An in-process, priority-ordered thread pool.
//!
//! A [`Pool`] owns a fixed (but resizable) set of [`Worker`] threads that
//! share one priority queue of [`Task`]s. [`Beehive`] is the typed façade
//! most callers want: [`Beehive::schedule`] runs a closure and hands back
//! its result, [`Beehive::for_each`] and [`Beehive::transform`] fan a
//! collection of items out across the pool.
//!
//! ```
//! use beehive::Beehive;
//!
//! let hive = Beehive::new_with_workers(2);
//! let future = hive.schedule(|| 2 + 2);
//! assert_eq!(future.wait(), Ok(4));
//! ```

mod config;
mod error;
mod facade;
mod idempotency;
mod message;
mod pool;
mod pq;
mod task;
mod time_counter;
mod worker;

pub use config::PoolConfig;
pub use error::BeehiveError;
pub use facade::{Beehive, TaskFuture};
pub use idempotency::IdempotencySet;
pub use message::{Handler, HandlerResult, Message, MessageQueue, SignalingQueue};
pub use pool::Pool;
pub use pq::{Order, PriorityQueue};
pub use task::{CompletionHandle, Priority, Task, DEFAULT_PRIORITY, MAX_PRIORITY, MIN_PRIORITY};
pub use time_counter::TimeCounter;
pub use worker::{Stats as WorkerStats, WorkerView};
