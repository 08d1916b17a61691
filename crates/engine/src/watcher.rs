// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The watcher every pipeline registers first on its event bus.

use crate::dispatcher::StreamMsgDispatcher;
use crate::streams::{EosProgress, StreamTable};
use flowkit_core::{BusWatcher, Event, EventKind, HandleFlag, StreamMsg, StreamMsgKind};
use std::sync::Arc;

/// Turns bus events into stream messages.
///
/// - `Error`: emits an error message and stops the bus
/// - `Warning`: logged only
/// - `Eos`: aggregated per stream; one EOS message once every module has passed it
/// - `StreamError`: emits a stream-error message
/// - `Stop`/`Invalid`: stops the bus
pub(crate) fn default_watcher(
    pipeline: Arc<str>,
    streams: Arc<StreamTable>,
    dispatcher: Arc<StreamMsgDispatcher>,
) -> BusWatcher {
    Box::new(move |event: &Event| match event.kind {
        EventKind::Error => {
            tracing::error!(
                pipeline = %pipeline,
                module = %event.module_name,
                stream_id = %event.stream_id,
                error = %event.message,
                "Module reported an error"
            );
            dispatcher.post(
                StreamMsg::new(StreamMsgKind::Error, &event.stream_id, event.channel_idx)
                    .from_module(&event.module_name),
            );
            HandleFlag::Stop
        },
        EventKind::Warning => {
            tracing::warn!(
                pipeline = %pipeline,
                module = %event.module_name,
                message = %event.message,
                "Module reported a warning"
            );
            HandleFlag::Synced
        },
        EventKind::Eos => {
            let progress = streams.acknowledge_eos(&event.stream_id, &event.passed_mask);
            if progress == EosProgress::Drained {
                tracing::info!(
                    pipeline = %pipeline,
                    stream_id = %event.stream_id,
                    "Stream fully drained"
                );
                dispatcher
                    .post(StreamMsg::new(StreamMsgKind::Eos, &event.stream_id, event.channel_idx));
            }
            HandleFlag::Synced
        },
        EventKind::StreamError => {
            tracing::warn!(
                pipeline = %pipeline,
                module = %event.module_name,
                stream_id = %event.stream_id,
                message = %event.message,
                "Stream error"
            );
            dispatcher.post(
                StreamMsg::new(StreamMsgKind::StreamError, &event.stream_id, event.channel_idx)
                    .from_module(&event.module_name),
            );
            HandleFlag::Synced
        },
        EventKind::Stop | EventKind::Invalid => HandleFlag::Stop,
    })
}
