// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Source module
//!
//! Produces a numbered stream of frames on its own thread, or does nothing and lets the
//! application feed frames through `Pipeline::provide_data` when `frames` is 0.

use flowkit_core::error::Result;
use flowkit_core::{
    params_helpers, FlowError, Frame, Module, ModuleHandle, ModuleParams, OpenContext,
    SharedFrame,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Collection key under which each produced frame carries its sequence number.
pub const SEQUENCE_KEY: &str = "seq";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Frames to produce; 0 disables the producer thread.
    pub frames: u64,
    pub stream_id: String,
    /// Delay between frames.
    pub interval_ms: u64,
    /// Terminate the stream with an EOS frame.
    pub send_eos: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { frames: 0, stream_id: "stream".to_string(), interval_ms: 0, send_eos: true }
    }
}

#[derive(Default)]
pub struct SourceModule {
    stop: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl SourceModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for SourceModule {
    fn check_params(&self, params: &ModuleParams) -> Result<()> {
        let config: SourceConfig = params_helpers::parse_params_required(params)?;
        if config.stream_id.is_empty() {
            return Err(FlowError::Configuration("'stream_id' must not be empty".to_string()));
        }
        Ok(())
    }

    fn open(&mut self, ctx: &OpenContext) -> Result<()> {
        let config: SourceConfig = params_helpers::parse_params_required(&ctx.params)?;
        if config.frames == 0 {
            tracing::debug!(module = %ctx.name, "No frame count; waiting for external data");
            return Ok(());
        }

        self.stop.store(false, Ordering::Release);
        let stop = Arc::clone(&self.stop);
        let handle = ctx.handle.clone();
        let producer = std::thread::Builder::new()
            .name(format!("fk-src-{}", ctx.name))
            .spawn(move || produce(&handle, &config, &stop))
            .map_err(|e| FlowError::Runtime(format!("Failed to spawn producer thread: {e}")))?;
        self.producer = Some(producer);
        Ok(())
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(producer) = self.producer.take() {
            if producer.join().is_err() {
                tracing::error!("Source producer thread panicked");
            }
        }
    }

    fn process(&self, _frame: &SharedFrame) -> Result<()> {
        Ok(())
    }
}

fn produce(handle: &ModuleHandle, config: &SourceConfig, stop: &AtomicBool) {
    // `open` runs before the pipeline accepts frames.
    if !handle.wait_until_running() {
        tracing::debug!(module = %handle.name(), "Pipeline never started; source idle");
        return;
    }
    let channel_idx = handle.stream_index(&config.stream_id).unwrap_or_default();
    tracing::info!(
        module = %handle.name(),
        stream_id = %config.stream_id,
        frames = config.frames,
        "Source starting"
    );

    for seq in 0..config.frames {
        let frame = Frame::new(config.stream_id.as_str(), channel_idx)
            .with_timestamp(i64::try_from(seq).unwrap_or(i64::MAX));
        frame.collection.insert(SEQUENCE_KEY, seq);
        if !deliver(handle, frame.into_shared(), stop) {
            tracing::debug!(module = %handle.name(), sent = seq, "Source stopped early");
            return;
        }
        if config.interval_ms > 0 {
            std::thread::sleep(Duration::from_millis(config.interval_ms));
        }
    }

    if config.send_eos {
        deliver(handle, Frame::eos(config.stream_id.as_str(), channel_idx).into_shared(), stop);
    }
    tracing::info!(module = %handle.name(), "Source finished");
}

/// Returns false once the source is closing or the pipeline refuses the frame.
fn deliver(handle: &ModuleHandle, frame: SharedFrame, stop: &AtomicBool) -> bool {
    !stop.load(Ordering::Acquire) && handle.transmit(frame)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx(params: &[(&str, &str)]) -> OpenContext {
        OpenContext {
            name: "src".to_string(),
            params: params.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
            handle: ModuleHandle::detached("src"),
        }
    }

    #[test]
    fn rejects_malformed_params() {
        let source = SourceModule::new();
        let params = HashMap::from([("frames".to_string(), "many".to_string())]);
        assert!(source.check_params(&params).is_err());

        let params = HashMap::from([("stream_id".to_string(), String::new())]);
        assert!(source.check_params(&params).is_err());

        assert!(source.check_params(&HashMap::new()).is_ok());
    }

    #[test]
    fn close_stops_a_blocked_producer() {
        let mut source = SourceModule::new();
        // A detached handle never reports running; the producer exits without sending.
        source.open(&ctx(&[("frames", "10")])).unwrap();
        assert!(source.producer.is_some());
        source.close();
        assert!(source.producer.is_none());
        source.close();
    }

    #[test]
    fn external_mode_spawns_nothing() {
        let mut source = SourceModule::new();
        source.open(&ctx(&[])).unwrap();
        assert!(source.producer.is_none());
        source.close();
    }
}
