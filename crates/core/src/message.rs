// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Stream-level messages: the only way results leave a pipeline.

use serde::Serialize;
use tokio::sync::mpsc;

/// The kind of a stream message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMsgKind {
    /// Every module has passed the stream's EOS.
    Eos,
    /// A module failed while processing the stream.
    Error,
    /// A module reported a stream-level failure without stopping.
    StreamError,
    /// A frame was flagged invalid and dropped.
    FrameError,
    /// Application-defined kinds.
    User(u8),
}

/// A notification for the pipeline's external observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMsg {
    pub kind: StreamMsgKind,
    pub stream_id: String,
    pub channel_idx: usize,
    /// The module the message concerns, if any.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub module_name: String,
    /// Presentation timestamp of the offending frame, for `FrameError`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl StreamMsg {
    pub fn new(kind: StreamMsgKind, stream_id: impl Into<String>, channel_idx: usize) -> Self {
        Self {
            kind,
            stream_id: stream_id.into(),
            channel_idx,
            module_name: String::new(),
            timestamp: None,
        }
    }

    #[must_use]
    pub fn from_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = module_name.into();
        self
    }

    #[must_use]
    pub fn at(mut self, timestamp: Option<i64>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Receives stream messages on the pipeline's dispatcher thread.
///
/// The callback may call `Pipeline::stop`; it must not block on the dispatcher itself.
pub trait StreamMsgObserver: Send + Sync {
    fn update(&self, msg: &StreamMsg);
}

impl<F> StreamMsgObserver for F
where
    F: Fn(&StreamMsg) + Send + Sync,
{
    fn update(&self, msg: &StreamMsg) {
        self(msg);
    }
}

/// Forwards stream messages into a tokio channel, for async callers.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StreamMsg>,
}

impl ChannelObserver {
    /// Creates the observer and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StreamMsgObserver for ChannelObserver {
    fn update(&self, msg: &StreamMsg) {
        if self.tx.send(msg.clone()).is_err() {
            tracing::debug!(stream_id = %msg.stream_id, "Stream message receiver dropped");
        }
    }
}
