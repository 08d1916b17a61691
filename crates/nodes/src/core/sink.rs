// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Sink module
//!
//! Accepts any frame and discards it, counting what it saw.
//! Useful as the terminal module of a branch and for graph wiring.

use flowkit_core::error::Result;
use flowkit_core::{params_helpers, Module, OpenContext, SharedFrame};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Log a progress line every N frames; 0 disables it.
    pub log_every: u64,
}

#[derive(Debug, Default)]
pub struct SinkModule {
    name: String,
    config: SinkConfig,
    frames: AtomicU64,
    streams_ended: AtomicU64,
}

impl SinkModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data frames received since the last open.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// EOS frames received since the last open.
    pub fn streams_ended(&self) -> u64 {
        self.streams_ended.load(Ordering::Relaxed)
    }
}

impl Module for SinkModule {
    fn open(&mut self, ctx: &OpenContext) -> Result<()> {
        self.name.clone_from(&ctx.name);
        self.config = params_helpers::parse_params_optional(&ctx.params);
        self.frames.store(0, Ordering::Relaxed);
        self.streams_ended.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) {
        tracing::debug!(
            module = %self.name,
            frames = self.frames(),
            streams = self.streams_ended(),
            "Sink closed"
        );
    }

    fn process(&self, frame: &SharedFrame) -> Result<()> {
        let seen = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        if self.config.log_every > 0 && seen % self.config.log_every == 0 {
            tracing::info!(
                module = %self.name,
                stream_id = %frame.stream_id(),
                frames = seen,
                "Sink progress"
            );
        }
        Ok(())
    }

    fn on_eos(&self, stream_id: &str) {
        self.streams_ended.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(module = %self.name, stream_id, "Sink reached end of stream");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use flowkit_core::{Frame, ModuleHandle};
    use std::collections::HashMap;

    #[test]
    fn counts_frames_and_streams() {
        let mut sink = SinkModule::new();
        let ctx = OpenContext {
            name: "sink".to_string(),
            params: HashMap::from([("log_every".to_string(), "2".to_string())]),
            handle: ModuleHandle::detached("sink"),
        };
        sink.open(&ctx).unwrap();
        assert_eq!(sink.config.log_every, 2);

        for idx in 0..3 {
            sink.process(&Frame::new("s", idx).into_shared()).unwrap();
        }
        sink.on_eos("s");
        assert_eq!(sink.frames(), 3);
        assert_eq!(sink.streams_ended(), 1);

        sink.close();
        sink.close();
        sink.open(&ctx).unwrap();
        assert_eq!(sink.frames(), 0);
    }
}
