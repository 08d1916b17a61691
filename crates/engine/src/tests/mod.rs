// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Unit tests for the engine crate.

mod graph;
mod routing;
mod streams;

use flowkit_core::error::Result;
use flowkit_core::{Module, SharedFrame};

/// Does nothing; enough to fill a graph.
pub(super) struct Nop;

impl Module for Nop {
    fn process(&self, _frame: &SharedFrame) -> Result<()> {
        Ok(())
    }
}

pub(super) fn nop() -> Box<dyn Module> {
    Box::new(Nop)
}
