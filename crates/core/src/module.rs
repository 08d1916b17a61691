// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Core module abstractions and the [`Module`] trait.
//!
//! This module defines the contract every processing stage implements:
//! - [`Module`]: lifecycle hooks (`open`/`close`) and the per-frame `process`
//! - [`Forwarding`]: whether the engine forwards frames or the module does it itself
//! - [`OpenContext`]: what a module receives when it is opened
//! - [`ModuleHandle`]: the module's way back into its pipeline (transmit, events, messages)

use crate::error::{FlowError, Result};
use crate::event::{Event, EventKind};
use crate::frame::SharedFrame;
use crate::mask::ModuleId;
use crate::message::{StreamMsg, StreamMsgKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Opaque key/value parameters handed to [`Module::open`].
pub type ModuleParams = HashMap<String, String>;

/// Who is responsible for delivering a processed frame downstream.
///
/// Read once when the module is added to a graph; never re-checked per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Forwarding {
    /// The engine forwards every successfully processed frame.
    #[default]
    Auto,
    /// The module forwards frames itself through [`ModuleHandle::transmit`].
    SelfTransmit,
}

/// The pipeline side of a [`ModuleHandle`].
///
/// Implemented by the engine; modules never see it directly.
pub trait PipelineLink: Send + Sync {
    /// Hands `frame` to the successors of `module`. Returns false if the frame was refused.
    fn transmit(&self, module: ModuleId, frame: SharedFrame) -> bool;

    /// Posts an event to the pipeline's event bus. Returns false if the bus is not running.
    fn post_event(&self, event: Event) -> bool;

    /// Queues a stream message for the pipeline's observer.
    fn post_stream_msg(&self, msg: StreamMsg) -> bool;

    /// Returns the dense channel index for `stream_id`, allocating one if needed.
    fn stream_index(&self, stream_id: &str) -> usize;

    /// Blocks while the pipeline is starting. True once it runs, false if it is stopped.
    fn wait_running(&self) -> bool;
}

/// A module's connection to the pipeline that owns it.
///
/// Holds only a weak reference: a handle kept alive by a module never keeps the pipeline alive.
#[derive(Clone)]
pub struct ModuleHandle {
    name: Arc<str>,
    id: ModuleId,
    link: Weak<dyn PipelineLink>,
}

impl ModuleHandle {
    pub fn new(name: Arc<str>, id: ModuleId, link: Weak<dyn PipelineLink>) -> Self {
        Self { name, id, link }
    }

    /// A handle that is not attached to any pipeline. Every call is a no-op returning false.
    pub fn detached(name: &str) -> Self {
        let link: Weak<dyn PipelineLink> = Weak::<DetachedLink>::new();
        Self { name: Arc::from(name), id: 0, link }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn id(&self) -> ModuleId {
        self.id
    }

    /// Sends `frame` downstream on behalf of this module.
    ///
    /// Only self-transmitting modules and source modules may call this; the engine refuses
    /// frames from auto-forwarding modules.
    pub fn transmit(&self, frame: SharedFrame) -> bool {
        self.link.upgrade().is_some_and(|link| link.transmit(self.id, frame))
    }

    /// Posts an event of `kind` with a human-readable message.
    pub fn post_event(&self, kind: EventKind, message: impl Into<String>) -> bool {
        self.post(Event::new(kind, self.name.as_ref(), message))
    }

    /// Posts a fully built event (e.g. one carrying stream identity).
    pub fn post(&self, event: Event) -> bool {
        self.link.upgrade().is_some_and(|link| link.post_event(event))
    }

    /// Emits a stream message to the pipeline's observer.
    pub fn post_stream_msg(
        &self,
        kind: StreamMsgKind,
        stream_id: impl Into<String>,
        channel_idx: usize,
    ) -> bool {
        let msg = StreamMsg::new(kind, stream_id, channel_idx).from_module(self.name.as_ref());
        self.link.upgrade().is_some_and(|link| link.post_stream_msg(msg))
    }

    /// Returns the channel index assigned to `stream_id`, or `None` when detached.
    pub fn stream_index(&self, stream_id: &str) -> Option<usize> {
        self.link.upgrade().map(|link| link.stream_index(stream_id))
    }

    /// Parks the caller until the pipeline has finished starting.
    ///
    /// Producer threads spawned from `open` call this before their first `transmit`.
    /// Returns false when the start was rolled back, the pipeline stopped, or the handle is
    /// detached.
    pub fn wait_until_running(&self) -> bool {
        self.link.upgrade().is_some_and(|link| link.wait_running())
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("attached", &(self.link.strong_count() > 0))
            .finish()
    }
}

struct DetachedLink;

impl PipelineLink for DetachedLink {
    fn transmit(&self, _module: ModuleId, _frame: SharedFrame) -> bool {
        false
    }

    fn post_event(&self, _event: Event) -> bool {
        false
    }

    fn post_stream_msg(&self, _msg: StreamMsg) -> bool {
        false
    }

    fn stream_index(&self, _stream_id: &str) -> usize {
        0
    }

    fn wait_running(&self) -> bool {
        false
    }
}

/// Context provided to a module when it is opened.
#[derive(Debug, Clone)]
pub struct OpenContext {
    pub name: String,
    pub params: ModuleParams,
    pub handle: ModuleHandle,
}

impl OpenContext {
    /// Looks up a parameter, returning a configuration error naming the module if absent.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if `key` is not set.
    pub fn require_param(&self, key: &str) -> Result<&str> {
        self.params.get(key).map(String::as_str).ok_or_else(|| {
            FlowError::Configuration(format!("module '{}' requires parameter '{key}'", self.name))
        })
    }
}

/// The fundamental trait for a processing stage.
///
/// `process` takes `&self` because several worker threads call it concurrently when the module
/// runs with parallelism > 1; per-stream state must use interior mutability.
pub trait Module: Send + Sync {
    /// One-time setup. An error aborts `Pipeline::start` and rolls back already-opened modules.
    ///
    /// # Errors
    ///
    /// Any error refuses the open; its message becomes the `ModuleOpen` reason.
    fn open(&mut self, _ctx: &OpenContext) -> Result<()> {
        Ok(())
    }

    /// Teardown. Must be idempotent: the engine may call it on a module that is already closed.
    fn close(&mut self) {}

    /// Processes one frame.
    ///
    /// `Ok` means success; an auto-forwarding module's frame is then delivered downstream.
    ///
    /// # Errors
    ///
    /// An error is reported on the event bus, the frame is dropped, and the calling worker
    /// stops permanently.
    fn process(&self, frame: &SharedFrame) -> Result<()>;

    /// Declares who forwards processed frames. Read once when the module is added to a graph.
    fn forwarding(&self) -> Forwarding {
        Forwarding::Auto
    }

    /// Called on an auto-forwarding module when an EOS frame for `stream_id` reaches it,
    /// before the EOS is passed on.
    fn on_eos(&self, _stream_id: &str) {}

    /// Validates parameters before `open` is called.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` describing the offending parameter.
    fn check_params(&self, _params: &ModuleParams) -> Result<()> {
        Ok(())
    }
}

/// A factory creating a module instance for a given instance name.
/// Wrapped in an Arc to make it cloneable.
pub type ModuleFactory = Arc<dyn Fn(&str) -> Result<Box<dyn Module>> + Send + Sync>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    #[test]
    fn detached_handle_refuses_everything() {
        let handle = ModuleHandle::detached("osd");
        assert_eq!(handle.name(), "osd");
        assert!(!handle.transmit(Frame::new("s", 0).into_shared()));
        assert!(!handle.post_event(EventKind::Warning, "late"));
        assert!(!handle.post_stream_msg(StreamMsgKind::User(1), "s", 0));
        assert_eq!(handle.stream_index("s"), None);
        assert!(!handle.wait_until_running());
    }

    #[test]
    fn require_param_names_the_module() {
        let ctx = OpenContext {
            name: "decoder".to_string(),
            params: HashMap::from([("device".to_string(), "0".to_string())]),
            handle: ModuleHandle::detached("decoder"),
        };
        assert_eq!(ctx.require_param("device").ok(), Some("0"));
        let err = ctx.require_param("codec").err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("'decoder'"));
        assert!(err.contains("'codec'"));
    }

    #[test]
    fn forwarding_defaults_to_auto() {
        struct Noop;
        impl Module for Noop {
            fn process(&self, _frame: &SharedFrame) -> Result<()> {
                Ok(())
            }
        }
        assert_eq!(Noop.forwarding(), Forwarding::Auto);
    }
}
