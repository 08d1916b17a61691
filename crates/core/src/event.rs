// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Event bus message types.
//!
//! Modules and worker threads post [`Event`]s; the bus consumer hands each one to a chain of
//! [`BusWatcher`]s, which answer with a [`HandleFlag`].

use crate::mask::ModuleMask;
use serde::Serialize;

/// The kind of an engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A module failed to process a frame.
    Error,
    /// Something noteworthy that does not interrupt processing.
    Warning,
    /// A module has passed the EOS frame of a stream.
    Eos,
    /// Ends the bus loop.
    Stop,
    /// Ends the bus loop; posted for malformed or unexpected events.
    Invalid,
    /// A stream-level failure the module wants surfaced to the observer.
    StreamError,
}

impl EventKind {
    /// Whether this kind ends the bus loop by itself.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stop | Self::Invalid)
    }
}

/// What a watcher decided about an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleFlag {
    /// Stop the bus loop; remaining watchers are skipped.
    Stop,
    /// Handled; keep offering the event to the remaining watchers.
    Synced,
    /// Handled; remaining watchers are skipped.
    Intercept,
    /// Not interested.
    Null,
}

impl HandleFlag {
    pub const fn short_circuits(self) -> bool {
        matches!(self, Self::Stop | Self::Intercept)
    }
}

/// A watcher callback. Runs on the bus consumer thread, one event at a time.
pub type BusWatcher = Box<dyn FnMut(&Event) -> HandleFlag + Send>;

/// One event posted to the bus.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    /// Name of the posting module (empty for engine-originated events).
    pub module_name: String,
    pub message: String,
    pub stream_id: String,
    pub channel_idx: usize,
    /// For EOS events: the modules that had passed the EOS frame when this event was posted.
    pub passed_mask: ModuleMask,
}

impl Event {
    pub fn new(
        kind: EventKind,
        module_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            module_name: module_name.into(),
            message: message.into(),
            stream_id: String::new(),
            channel_idx: 0,
            passed_mask: ModuleMask::new(),
        }
    }

    /// The event that ends the bus loop.
    pub fn stop() -> Self {
        Self::new(EventKind::Stop, "", "stop")
    }

    #[must_use]
    pub fn with_stream(mut self, stream_id: impl Into<String>, channel_idx: usize) -> Self {
        self.stream_id = stream_id.into();
        self.channel_idx = channel_idx;
        self
    }

    #[must_use]
    pub fn with_mask(mut self, mask: ModuleMask) -> Self {
        self.passed_mask = mask;
        self
    }
}
