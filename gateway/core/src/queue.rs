// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The three bounded, single-producer/single-consumer hand-off queues (§3).
//!
//! Each wraps a `crossbeam_channel` bounded channel and enforces drop-on-full
//! semantics on the producer side: a full queue never blocks the ingestor
//! that feeds it, it just logs and drops (§7 `QueueFull`).

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use log::warn;
use std::time::Duration;

/// Capacity of the high-priority (primary-radio) queue.
pub const HIGH_PRIO_CAPACITY: usize = 100;
/// Capacity of the low-priority (scout-radio) queue.
pub const LOW_PRIO_CAPACITY: usize = 500;
/// Capacity of the alert queue.
pub const ALERT_CAPACITY: usize = 50;

/// A bounded queue with a human-readable name (used only for logging on
/// drop) and non-blocking, drop-on-full producer semantics.
#[derive(Clone)]
pub struct BoundedQueue<T> {
    name: &'static str,
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> BoundedQueue<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        BoundedQueue { name, tx, rx }
    }

    /// Attempts to enqueue `item` without blocking. On a full queue, logs a
    /// warning naming the queue and drops the item; the queue's occupancy is
    /// unchanged by a dropped put.
    pub fn try_put(&self, item: T) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(item) {
            warn!("{} queue full, dropping item", self.name);
        }
        // A `Disconnected` error can only happen once every consumer handle
        // has been dropped, i.e. during shutdown; there's nothing further to
        // do with the item at that point.
    }

    /// Non-blocking pop; `None` if empty.
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Pops with a bounded wait, used by the consumer to coalesce CPU spin
    /// with cooperative shutdown checks.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
