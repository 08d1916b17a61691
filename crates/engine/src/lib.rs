// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! engine: The pipeline execution engine for FlowKit.
//!
//! Builds module graphs (directly through [`PipelineBuilder`] or from a [`PipelineConfig`]
//! through [`Engine`]) and runs them on one OS thread per module worker.

use flowkit_api::PipelineConfig;
use flowkit_core::error::Result;
use flowkit_core::{FlowError, ModuleRegistry};
use std::sync::{Arc, PoisonError, RwLock};

// --- Public Modules ---

pub mod connector;
pub mod constants;
pub mod conveyor;
pub mod dispatcher;
pub mod event_bus;
pub mod graph;
pub mod pipeline;
pub mod streams;

mod watcher;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests;

// Re-exports
pub use connector::{Connector, ConnectorStatus};
pub use conveyor::{Conveyor, PushOutcome};
pub use graph::{link_id, Graph, GraphBuilder, GraphNode, LinkId, ModuleOptions};
pub use pipeline::{FrameDoneFn, ModuleObserverFn, Pipeline, PipelineBuilder};
pub use streams::{EosProgress, StreamTable};

/// Unified entry point: a module registry plus the logic to turn a description into a
/// [`Pipeline`].
pub struct Engine {
    pub registry: Arc<RwLock<ModuleRegistry>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the built-in modules registered.
    pub fn new() -> Self {
        let mut registry = ModuleRegistry::new();
        flowkit_nodes::register_nodes(&mut registry);
        Self::with_registry(registry)
    }

    pub fn with_registry(registry: ModuleRegistry) -> Self {
        Self { registry: Arc::new(RwLock::new(registry)) }
    }

    /// Instantiates every module of `config` by class name and links them.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if the description is invalid, a class is unknown,
    /// a module without upstream links is not of a source class, or the graph has a cycle.
    pub fn build_pipeline(&self, name: &str, config: &PipelineConfig) -> Result<Pipeline> {
        config.validate()?;
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);

        let mut has_upstream = std::collections::HashSet::new();
        for (_, downstream) in config.links() {
            has_upstream.insert(downstream);
        }

        let mut builder = PipelineBuilder::new(name);
        for (module_name, module_config) in &config.modules {
            if !has_upstream.contains(module_name.as_str())
                && !registry.is_source(&module_config.class_name)
            {
                return Err(FlowError::Configuration(format!(
                    "Module '{module_name}' (class '{}') is not linked to any module",
                    module_config.class_name
                )));
            }
            let module = registry.create(&module_config.class_name, module_name)?;
            let options = ModuleOptions {
                parallelism: module_config.parallelism,
                queue_capacity: module_config.max_input_queue_size,
                input_mode: module_config.input_mode,
                params: module_config.custom_params.clone(),
            };
            builder.add_module(module_name.as_str(), module, options)?;
        }
        drop(registry);

        for (upstream, downstream) in config.links() {
            builder.link(upstream, downstream)?;
        }

        tracing::info!(
            pipeline = name,
            modules = config.modules.len(),
            "Building pipeline from description"
        );
        builder.build()
    }
}
