// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use flowkit_core::ModuleRegistry;

pub mod core;

/// A single function to register all built-in modules.
pub fn register_nodes(registry: &mut ModuleRegistry) {
    core::register_core_nodes(registry);

    tracing::info!("Finished registering built-in modules.");
}
