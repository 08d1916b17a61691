// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The input transport of one module.
//!
//! A [`Connector`] owns one [`Conveyor`] per worker of the consuming module. Every frame of a
//! stream lands on the same conveyor (`channel_idx % conveyor_count`), so a stream is never
//! reordered even when the consumer runs several workers.

use crate::conveyor::{Conveyor, PushOutcome};
use flowkit_core::{InputMode, SharedFrame};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snapshot returned by [`Connector::query_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorStatus {
    pub stopped: bool,
    /// Depth of each conveyor, indexed by worker.
    pub depths: Vec<usize>,
}

#[derive(Debug)]
pub struct Connector {
    conveyors: Vec<Conveyor>,
    stopped: Arc<AtomicBool>,
}

impl Connector {
    /// Allocates `conveyor_count` conveyors of `capacity` frames each. Starts running.
    pub fn new(conveyor_count: usize, capacity: usize, mode: InputMode) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));
        let conveyors = (0..conveyor_count.max(1))
            .map(|_| Conveyor::new(capacity, mode, Arc::clone(&stopped)))
            .collect();
        Self { conveyors, stopped }
    }

    pub fn conveyor_count(&self) -> usize {
        self.conveyors.len()
    }

    pub fn conveyor(&self, worker_index: usize) -> Option<&Conveyor> {
        self.conveyors.get(worker_index)
    }

    /// The worker responsible for `channel_idx`.
    pub fn route(&self, channel_idx: usize) -> usize {
        channel_idx % self.conveyors.len()
    }

    /// Routes `frame` by its channel index and pushes it.
    pub fn push(&self, frame: SharedFrame) -> PushOutcome {
        let worker_index = self.route(frame.channel_idx());
        self.push_to(worker_index, frame)
    }

    /// Pushes to an explicit conveyor. An out-of-range index discards the frame.
    pub fn push_to(&self, worker_index: usize, frame: SharedFrame) -> PushOutcome {
        match self.conveyors.get(worker_index) {
            Some(conveyor) => conveyor.push(frame),
            None => {
                tracing::warn!(
                    worker_index,
                    conveyors = self.conveyors.len(),
                    "Push to non-existent conveyor; frame dropped"
                );
                PushOutcome::Rejected
            },
        }
    }

    /// Pops from an explicit conveyor. `None` means stopped (or an out-of-range index).
    pub fn pop_from(&self, worker_index: usize) -> Option<SharedFrame> {
        self.conveyors.get(worker_index).and_then(Conveyor::pop)
    }

    /// Clears the stop flag.
    pub fn start(&self) {
        self.stopped.store(false, Ordering::Release);
    }

    /// Raises the stop flag and unblocks every thread parked in `push` or `pop`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        for conveyor in &self.conveyors {
            conveyor.wake_all();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Empties every conveyor, returning what was queued.
    pub fn drain_all(&self) -> Vec<SharedFrame> {
        self.conveyors.iter().flat_map(Conveyor::drain_all).collect()
    }

    pub fn query_status(&self) -> ConnectorStatus {
        ConnectorStatus {
            stopped: self.is_stopped(),
            depths: self.conveyors.iter().map(Conveyor::len).collect(),
        }
    }
}
