// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use super::nop;
use crate::constants::MAX_THREAD_NAME_LEN;
use crate::graph::ModuleOptions;
use crate::pipeline::{worker_thread_name, Pipeline};
use flowkit_core::error::Result;
use flowkit_core::{Frame, FlowError, Module, OpenContext, SharedFrame};
use std::sync::Mutex;

#[test]
fn worker_names_fit_the_platform_limit() {
    assert_eq!(worker_thread_name("det", 0), "fk-det-0");
    let long = worker_thread_name("pose_estimation_postprocess", 12);
    assert_eq!(long, "fk-pose_esti-12");
    assert!(long.len() <= MAX_THREAD_NAME_LEN);
    // Never splits a multi-byte character.
    assert!(worker_thread_name("ééééééééééé", 1).len() <= MAX_THREAD_NAME_LEN);
}

/// Keeps the handle it was opened with, so the test can transmit through it.
#[derive(Default)]
struct Leaky {
    ctx: Mutex<Option<OpenContext>>,
}

impl Module for Leaky {
    fn open(&mut self, ctx: &OpenContext) -> Result<()> {
        *self.ctx.get_mut().unwrap() = Some(ctx.clone());
        Ok(())
    }

    fn process(&self, frame: &SharedFrame) -> Result<()> {
        let ctx = self.ctx.lock().unwrap();
        let handle = &ctx.as_ref().unwrap().handle;
        // Auto-forwarding, non-root: the engine must refuse.
        if handle.transmit(std::sync::Arc::clone(frame)) {
            return Err(FlowError::process("leaky", "transmit was accepted"));
        }
        Ok(())
    }
}

#[test]
fn provide_data_is_limited_to_running_roots() {
    let mut builder = Pipeline::builder("routing");
    builder.add_module("src", nop(), ModuleOptions::default()).unwrap();
    builder.add_module("leaky", Box::new(Leaky::default()), ModuleOptions::default()).unwrap();
    builder.link("src", "leaky").unwrap();
    let pipeline = builder.build().unwrap();

    let frame = || Frame::new("s", 0).into_shared();
    assert!(matches!(pipeline.provide_data("src", frame()), Err(FlowError::Runtime(_))));

    pipeline.start().unwrap();
    assert!(matches!(pipeline.provide_data("leaky", frame()), Err(FlowError::Configuration(_))));
    assert!(matches!(pipeline.provide_data("nope", frame()), Err(FlowError::Configuration(_))));
    pipeline.provide_data("src", frame()).unwrap();

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
    while pipeline.module_stats()["leaky"].sent == 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
    let stats = pipeline.module_stats();
    assert_eq!(stats["leaky"].sent, 1);
    assert_eq!(stats["leaky"].errored, 0);
    pipeline.stop();
}
