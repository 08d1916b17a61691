// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Per-stream bookkeeping: channel index allocation, removal marks and EOS aggregation.

use flowkit_core::ModuleMask;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result of acknowledging one module's EOS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EosProgress {
    /// No pipeline run is active; the acknowledgement was ignored.
    Ignored,
    /// Some modules have not passed the EOS yet.
    Pending,
    /// Every module has passed the EOS; the stream's state was released.
    Drained,
}

#[derive(Debug, Default)]
struct StreamState {
    indices: HashMap<String, usize>,
    /// `used[i]` is true while index `i` is assigned.
    used: Vec<bool>,
    removed: HashSet<String>,
    eos_mask: ModuleMask,
    eos_pending: HashMap<String, ModuleMask>,
}

impl StreamState {
    fn release(&mut self, stream_id: &str) {
        if let Some(idx) = self.indices.remove(stream_id) {
            if let Some(slot) = self.used.get_mut(idx) {
                *slot = false;
            }
        }
        self.removed.remove(stream_id);
    }
}

#[derive(Debug, Default)]
pub struct StreamTable {
    state: Mutex<StreamState>,
}

impl StreamTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the index of `stream_id`, assigning the smallest free one on first use.
    pub fn index_of(&self, stream_id: &str) -> usize {
        let mut state = self.lock();
        if let Some(&idx) = state.indices.get(stream_id) {
            return idx;
        }
        let idx = match state.used.iter().position(|used| !used) {
            Some(free) => {
                state.used[free] = true;
                free
            },
            None => {
                state.used.push(true);
                state.used.len() - 1
            },
        };
        state.indices.insert(stream_id.to_string(), idx);
        tracing::debug!(stream_id, channel_idx = idx, "Assigned stream index");
        idx
    }

    /// Frees the index of `stream_id` so it can be reused.
    pub fn release(&self, stream_id: &str) {
        self.lock().release(stream_id);
    }

    /// Marks a stream removed. Returns false if it already was.
    pub fn mark_removed(&self, stream_id: &str) -> bool {
        self.lock().removed.insert(stream_id.to_string())
    }

    pub fn is_removed(&self, stream_id: &str) -> bool {
        self.lock().removed.contains(stream_id)
    }

    /// Sets the mask an EOS must collect. An empty mask disables aggregation.
    pub fn set_eos_mask(&self, mask: ModuleMask) {
        let mut state = self.lock();
        state.eos_mask = mask;
        state.eos_pending.clear();
    }

    /// Merges the modules in `passed` into the stream's EOS progress.
    pub fn acknowledge_eos(&self, stream_id: &str, passed: &ModuleMask) -> EosProgress {
        let mut state = self.lock();
        if state.eos_mask.is_empty() {
            return EosProgress::Ignored;
        }
        let acknowledged = {
            let entry = state.eos_pending.entry(stream_id.to_string()).or_default();
            entry.union_with(passed);
            entry.clone()
        };
        if acknowledged.covers(&state.eos_mask) {
            state.eos_pending.remove(stream_id);
            state.release(stream_id);
            EosProgress::Drained
        } else {
            EosProgress::Pending
        }
    }

    /// Streams with at least one EOS acknowledgement still waiting on other modules.
    pub fn pending_eos(&self) -> Vec<String> {
        let mut pending: Vec<String> = self.lock().eos_pending.keys().cloned().collect();
        pending.sort();
        pending
    }
}
