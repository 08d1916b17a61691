// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! A single bounded FIFO between the producers of a link and one consumer worker.
//!
//! Blocking is done with condition variables. The stop flag is owned by the
//! [`Connector`](crate::connector::Connector); once it is raised every parked `push` and
//! `pop` returns immediately.

use flowkit_core::{InputMode, SharedFrame};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// What happened to a pushed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The frame was queued.
    Queued,
    /// The queue was full; its oldest data frame was evicted to make room.
    DroppedOldest,
    /// The link is stopped; the frame was discarded.
    Rejected,
}

#[derive(Debug)]
pub struct Conveyor {
    queue: Mutex<VecDeque<SharedFrame>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    mode: InputMode,
    stopped: Arc<AtomicBool>,
}

impl Conveyor {
    /// Creates a conveyor observing `stopped`. A zero capacity is raised to 1.
    pub(crate) fn new(capacity: usize, mode: InputMode, stopped: Arc<AtomicBool>) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            mode,
            stopped,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SharedFrame>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Enqueues `frame`.
    ///
    /// With [`InputMode::Reliable`] this blocks while the queue is full; with
    /// [`InputMode::BestEffort`] it evicts the oldest data frame instead. EOS frames are kept,
    /// so a queue full of them may briefly exceed its capacity. A stopped link discards the frame.
    pub fn push(&self, frame: SharedFrame) -> PushOutcome {
        let mut queue = self.lock();
        let mut outcome = PushOutcome::Queued;
        loop {
            if self.is_stopped() {
                return PushOutcome::Rejected;
            }
            if queue.len() < self.capacity {
                break;
            }
            if self.mode.drops_oldest() {
                // EOS frames are never evicted; a queue holding nothing else overflows instead.
                if let Some(victim) = queue.iter().position(|queued| !queued.is_eos()) {
                    queue.remove(victim);
                    outcome = PushOutcome::DroppedOldest;
                }
                break;
            }
            queue = self.not_full.wait(queue).unwrap_or_else(PoisonError::into_inner);
        }
        queue.push_back(frame);
        drop(queue);
        self.not_empty.notify_one();
        outcome
    }

    /// Dequeues the next frame, blocking while the queue is empty.
    ///
    /// Returns `None` once the link is stopped: no more data will ever arrive here.
    /// Frames still queued at that point are left for [`Conveyor::drain_all`].
    pub fn pop(&self) -> Option<SharedFrame> {
        let mut queue = self.lock();
        loop {
            if self.is_stopped() {
                return None;
            }
            if let Some(frame) = queue.pop_front() {
                drop(queue);
                self.not_full.notify_one();
                return Some(frame);
            }
            queue = self.not_empty.wait(queue).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Empties the queue without blocking.
    pub fn drain_all(&self) -> Vec<SharedFrame> {
        let drained: Vec<SharedFrame> = self.lock().drain(..).collect();
        self.not_full.notify_all();
        drained
    }

    /// Current depth.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn mode(&self) -> InputMode {
        self.mode
    }

    /// Wakes every parked producer and consumer so they re-check the stop flag.
    ///
    /// Taking the lock first guarantees a waiter is either parked (and gets notified) or has
    /// not yet checked the flag (and will see it raised).
    pub(crate) fn wake_all(&self) {
        let _queue = self.lock();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}
