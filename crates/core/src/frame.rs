// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The unit of work flowing through a pipeline.
//!
//! A [`Frame`] carries routing identity (`stream_id`, `channel_idx`), control flags (EOS,
//! invalid, removed), the mask of modules that have already passed it, and an opaque,
//! type-keyed payload [`Collection`].
//!
//! Frames travel as [`SharedFrame`] (`Arc<Frame>`): on fan-out every branch holds the same
//! frame, so the passed-mask and payload use interior locking.

use crate::mask::{ModuleId, ModuleMask};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A frame shared between the branches of a fan-out.
pub type SharedFrame = Arc<Frame>;

/// Control flags carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameFlag {
    /// End of the stream; carries no data.
    Eos = 1 << 0,
    /// The producer could not produce valid data (e.g. decode failure).
    Invalid = 1 << 1,
    /// The stream was removed while this frame was in flight.
    Removed = 1 << 2,
}

/// Type-keyed payload storage.
///
/// Modules attach their results under string keys and downstream modules read them back by type.
#[derive(Default)]
pub struct Collection {
    items: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Collection {
    /// Stores `value` under `key`, replacing any previous value. Returns true if the key was new.
    pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> bool {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.into(), Arc::new(value)).is_none()
    }

    /// Returns the value under `key` if present and of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned().and_then(|item| item.downcast::<T>().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_set().entries(items.keys()).finish()
    }
}

/// One unit of work.
pub struct Frame {
    stream_id: Arc<str>,
    channel_idx: usize,
    timestamp: Option<i64>,
    flags: AtomicU8,
    passed: Mutex<ModuleMask>,
    /// Opaque payload; the engine never looks inside.
    pub collection: Collection,
}

impl Frame {
    /// Creates a data frame for `stream_id`.
    ///
    /// `channel_idx` must be stable for the whole stream: the engine routes on it.
    pub fn new(stream_id: impl Into<Arc<str>>, channel_idx: usize) -> Self {
        Self {
            stream_id: stream_id.into(),
            channel_idx,
            timestamp: None,
            flags: AtomicU8::new(0),
            passed: Mutex::new(ModuleMask::new()),
            collection: Collection::default(),
        }
    }

    /// Creates the EOS frame terminating `stream_id`.
    pub fn eos(stream_id: impl Into<Arc<str>>, channel_idx: usize) -> Self {
        let frame = Self::new(stream_id, channel_idx);
        frame.set_flag(FrameFlag::Eos);
        frame
    }

    /// Attaches a presentation timestamp, reported back in frame error messages.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn into_shared(self) -> SharedFrame {
        Arc::new(self)
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub const fn channel_idx(&self) -> usize {
        self.channel_idx
    }

    pub const fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn has_flag(&self, flag: FrameFlag) -> bool {
        self.flags.load(Ordering::Acquire) & flag as u8 != 0
    }

    pub fn set_flag(&self, flag: FrameFlag) {
        self.flags.fetch_or(flag as u8, Ordering::AcqRel);
    }

    pub fn is_eos(&self) -> bool {
        self.has_flag(FrameFlag::Eos)
    }

    pub fn is_invalid(&self) -> bool {
        self.has_flag(FrameFlag::Invalid)
    }

    pub fn is_removed(&self) -> bool {
        self.has_flag(FrameFlag::Removed)
    }

    /// Snapshot of the modules that have passed this frame.
    pub fn passed_modules(&self) -> ModuleMask {
        self.passed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Overwrites the passed-mask. Used by the engine when a root module emits the frame.
    pub fn reset_passed_modules(&self, mask: ModuleMask) {
        *self.passed.lock().unwrap_or_else(PoisonError::into_inner) = mask;
    }

    /// Marks `module` as passed and returns the resulting mask.
    ///
    /// The read-modify-write is atomic, so of several branches finishing concurrently exactly
    /// one observes the mask that completes a join.
    pub fn mark_passed(&self, module: ModuleId) -> ModuleMask {
        let mut passed = self.passed.lock().unwrap_or_else(PoisonError::into_inner);
        passed.insert(module);
        passed.clone()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("stream_id", &self.stream_id)
            .field("channel_idx", &self.channel_idx)
            .field("timestamp", &self.timestamp)
            .field("flags", &self.flags.load(Ordering::Relaxed))
            .field("passed", &self.passed_modules())
            .field("collection", &self.collection)
            .finish()
    }
}
