// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Shared engine constants.
//!
//! Queue capacities are measured in frames (not bytes). The memory footprint depends on what
//! modules attach to each frame's collection.
//!
//! - **Higher capacity** = more buffering, higher latency, smoother throughput
//! - **Lower capacity** = less buffering, lower latency, earlier backpressure

// === Module defaults ===

/// Default capacity of each input conveyor of a module.
///
/// A module with parallelism `P` buffers up to `P × capacity` frames in total.
pub const DEFAULT_QUEUE_CAPACITY: usize = flowkit_api::DEFAULT_MAX_INPUT_QUEUE_SIZE;

/// Default number of worker threads per module.
pub const DEFAULT_PARALLELISM: usize = flowkit_api::DEFAULT_PARALLELISM;

// === Threads ===

/// Prefix of every engine-owned thread name.
pub const THREAD_NAME_PREFIX: &str = "fk";

/// Linux truncates thread names past 15 bytes; worker names are shortened to fit.
pub const MAX_THREAD_NAME_LEN: usize = 15;

/// Name of the event bus consumer thread.
pub const EVENT_BUS_THREAD_NAME: &str = "fk-event-bus";

/// Name of the stream-message dispatcher thread.
pub const DISPATCHER_THREAD_NAME: &str = "fk-stream-msg";

// === Telemetry ===

/// OpenTelemetry meter name for all engine instruments.
pub const METER_NAME: &str = "flowkit_engine";

/// Separator between the two module names of a link id (`"<up>--><down>"`).
pub const LINK_ID_SEPARATOR: &str = "-->";
