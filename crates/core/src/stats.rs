// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Module statistics tracking.
//!
//! Every worker of a module bumps the same [`ModuleStatsTracker`]; callers read a
//! [`ModuleStats`] snapshot.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Runtime statistics for a module, tracking frame processing metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleStats {
    /// Total frames popped from the module's input conveyors
    pub received: u64,
    /// Total frames queued on at least one successor (or completed, for leaf modules)
    pub sent: u64,
    /// Total frames discarded (removed streams, invalid frames, drop-oldest evictions)
    pub discarded: u64,
    /// Total processing errors
    pub errored: u64,
    /// Duration in seconds since the tracker was created (for rate calculation)
    pub duration_secs: f64,
}

/// Lock-free counters shared by all workers of one module.
#[derive(Debug)]
pub struct ModuleStatsTracker {
    received: AtomicU64,
    sent: AtomicU64,
    discarded: AtomicU64,
    errored: AtomicU64,
    start_time: Instant,
}

impl Default for ModuleStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleStatsTracker {
    pub fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            errored: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a received frame
    #[inline]
    pub fn received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sent frame
    #[inline]
    pub fn sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a discarded frame
    #[inline]
    pub fn discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record multiple discarded frames (teardown drains)
    #[inline]
    pub fn discarded_n(&self, count: u64) {
        self.discarded.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an error
    #[inline]
    pub fn errored(&self) {
        self.errored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ModuleStats {
        ModuleStats {
            received: self.received.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
            duration_secs: self.start_time.elapsed().as_secs_f64(),
        }
    }
}
