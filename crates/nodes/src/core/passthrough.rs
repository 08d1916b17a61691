// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use flowkit_core::error::Result;
use flowkit_core::{Module, SharedFrame};

/// A module that does nothing; the engine forwards every frame it receives.
/// Useful for testing routing, fan-out and fan-in.
#[derive(Default)]
pub struct PassthroughModule;

impl Module for PassthroughModule {
    fn process(&self, _frame: &SharedFrame) -> Result<()> {
        Ok(())
    }
}
