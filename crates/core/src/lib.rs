// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! FlowKit Core - Fundamental traits and data structures for frame-processing pipelines.
//!
//! This crate defines the core abstractions for building FlowKit pipelines:
//!
//! ## Core Modules
//!
//! - [`frame`]: Frame, frame flags and the type-keyed payload collection
//! - [`mask`]: Growable module bitset used for fan-in and EOS tracking
//! - [`module`]: Module trait, forwarding capability and the module handle
//! - [`event`]: Event bus events and watcher flags
//! - [`message`]: Stream messages and observers
//! - [`registry`]: Module factory and discovery system
//! - [`stats`]: Module statistics collection
//! - [`control`]: Backpressure policy of module inputs
//! - [`error`]: Error types and handling
//! - [`helpers`]: Utility functions for module parameters
//!
//! ## Quick Start
//!
//! ```ignore
//! use flowkit_core::{Module, ModuleRegistry, SharedFrame};
//!
//! struct Tagger;
//!
//! impl Module for Tagger {
//!     fn process(&self, frame: &SharedFrame) -> flowkit_core::error::Result<()> {
//!         frame.collection.insert("tagged", true);
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ModuleRegistry::new();
//! registry.register("demo::tagger", |_| Ok(Box::new(Tagger) as Box<dyn Module>));
//! ```

pub mod control;
pub mod error;
pub mod event;
pub mod frame;
pub mod helpers;
pub mod mask;
pub mod message;
pub mod module;
pub mod registry;
pub mod stats;

// Backpressure
pub use control::InputMode;

// Error handling
pub use error::FlowError;

// Frames and masks
pub use frame::{Collection, Frame, FrameFlag, SharedFrame};
pub use mask::{ModuleId, ModuleMask};

// Core module abstractions
pub use module::{
    Forwarding, Module, ModuleFactory, ModuleHandle, ModuleParams, OpenContext, PipelineLink,
};

// Events and stream messages
pub use event::{BusWatcher, Event, EventKind, HandleFlag};
pub use message::{ChannelObserver, StreamMsg, StreamMsgKind, StreamMsgObserver};

// Registry and factory
pub use registry::{ModuleDefinition, ModuleRegistry};

// Statistics
pub use stats::{ModuleStats, ModuleStatsTracker};

pub use helpers::params_helpers;
