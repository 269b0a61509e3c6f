//! Blocking multi-producer/multi-consumer ready-queue
//!
//! The queue has two shutdown modes: [`close`](BlockingQueue::close) stops
//! accepting new items but lets consumers drain what is already buffered,
//! while [`cancel`](BlockingQueue::cancel) stops accepting new items and
//! discards the buffer. In both modes every blocked [`take`](BlockingQueue::take)
//! eventually returns.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// An unbounded blocking MPMC channel.
///
/// Ordering is FIFO, but consumers must not rely on it: the scheduler
/// re-enqueues items it is not yet able to process.
pub struct BlockingQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

struct QueueState<T> {
    buffer: VecDeque<T>,
    closed: bool,
}

impl<T> BlockingQueue<T> {
    /// Create an empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                buffer: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an item. Returns `false` if the queue is closed, in which case
    /// the item is dropped rather than enqueued.
    pub fn put(&self, item: T) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.buffer.push_back(item);
        self.available.notify_one();
        true
    }

    /// Remove the oldest item, blocking while the queue is open and empty.
    ///
    /// Returns `None` only once the queue is closed and fully drained.
    pub fn take(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.buffer.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Close the queue; buffered items remain drainable. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.available.notify_all();
    }

    /// Close the queue and discard everything buffered. Idempotent.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.buffer.clear();
        self.available.notify_all();
    }

    /// Non-blocking closed-state query.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of currently buffered items.
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
