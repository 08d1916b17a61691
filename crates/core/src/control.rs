// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Backpressure control for module input queues.

use serde::{Deserialize, Serialize};

/// Specifies how a module's input queues handle a slow consumer.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Synchronized backpressure.
    /// If the module is slow, the upstream producer waits for room in the queue.
    /// No frame is lost but the pipeline can stall.
    #[default]
    Reliable,

    /// Drops the oldest queued frame when the queue is full.
    /// Useful for live sources where fresh frames matter more than complete ones.
    /// Dropped frames are counted in metrics.
    BestEffort,
}

impl InputMode {
    pub const fn drops_oldest(self) -> bool {
        matches!(self, Self::BestEffort)
    }
}
