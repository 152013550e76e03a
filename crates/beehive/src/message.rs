//! FIFO control-message queue with a signaling (condvar) variant and a
//! handler-driven dispatch loop.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// One of the four control messages a worker can receive. Equality is
/// structural (same tag), matching `beehive::Message::operator==` in the
/// source this scheduler is modeled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Nop,
    Exit,
    Task,
    Dump,
}

/// A plain guarded FIFO. `send` never blocks; `receive` never blocks either —
/// it returns `None` immediately if the queue is empty. [`SignalingQueue`]
/// builds the blocking behavior on top of this.
#[derive(Debug)]
pub struct MessageQueue<T> {
    queue: Mutex<VecDeque<T>>,
}

impl<T> MessageQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn send(&self, message: T) {
        self.queue.lock().push_back(message);
    }

    pub fn receive(&self) -> Option<T> {
        self.queue.lock().pop_front()
    }

    pub fn empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The result a [`Handler`] returns after dispatching one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    Continue,
    Finish,
    Error,
}

/// Per-message-kind dispatch, with the default base behavior from spec.md
/// §4.4: `on_nop`/`on_task`/`on_dump` continue the loop, `on_exit` finishes
/// it, and the before/after hooks are no-ops unless overridden.
pub trait Handler {
    fn on_before_message(&mut self) {}
    fn on_after_message(&mut self) {}

    fn on_nop(&mut self) -> HandlerResult {
        HandlerResult::Continue
    }

    fn on_exit(&mut self) -> HandlerResult {
        HandlerResult::Finish
    }

    fn on_task(&mut self) -> HandlerResult {
        HandlerResult::Continue
    }

    fn on_dump(&mut self) -> HandlerResult {
        HandlerResult::Continue
    }
}

/// A [`MessageQueue`] of [`Message`]s with a condition variable, so
/// [`receive`](Self::receive) can block a consumer until a message arrives
/// or `wait_granularity` elapses, whichever is first.
#[derive(Debug)]
pub struct SignalingQueue {
    queue: MessageQueue<Message>,
    wait_mutex: Mutex<()>,
    wait_condvar: Condvar,
    wait_granularity: Duration,
}

impl SignalingQueue {
    pub fn new(wait_granularity: Duration) -> Self {
        Self {
            queue: MessageQueue::new(),
            wait_mutex: Mutex::new(()),
            wait_condvar: Condvar::new(),
            wait_granularity,
        }
    }

    /// Enqueues `message` and wakes every thread blocked in
    /// [`receive`](Self::receive).
    pub fn send(&self, message: Message) {
        self.queue.send(message);
        // Hold the wait mutex while notifying so a receiver that just found
        // the queue empty, and is about to wait, can't miss this wakeup.
        let _guard = self.wait_mutex.lock();
        self.wait_condvar.notify_all();
    }

    pub fn empty(&self) -> bool {
        self.queue.empty()
    }

    /// Blocks until a message is available. Re-checks at least every
    /// `wait_granularity`; this bounded wait (rather than an unbounded one)
    /// is what lets a receiver notice an externally driven shutdown and
    /// compensates for a send that landed between the empty-check and the
    /// condvar wait.
    pub fn receive(&self) -> Message {
        loop {
            if let Some(message) = self.queue.receive() {
                return message;
            }
            let mut guard = self.wait_mutex.lock();
            if !self.queue.empty() {
                continue;
            }
            self.wait_condvar.wait_for(&mut guard, self.wait_granularity);
        }
    }

    /// Drives `handler`'s state machine: receive a message, dispatch the
    /// before hook, the tag-specific handler, and the after hook, then stop
    /// once the handler returns anything other than
    /// [`HandlerResult::Continue`].
    pub fn run(&self, handler: &mut dyn Handler) {
        loop {
            let message = self.receive();
            handler.on_before_message();
            let result = match message {
                Message::Nop => handler.on_nop(),
                Message::Exit => handler.on_exit(),
                Message::Task => handler.on_task(),
                Message::Dump => handler.on_dump(),
            };
            handler.on_after_message();
            if result != HandlerResult::Continue {
                break;
            }
        }
    }
}
