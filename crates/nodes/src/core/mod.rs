// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use flowkit_core::{Module, ModuleRegistry};

mod passthrough;
pub mod sink;
pub mod source;

pub use passthrough::PassthroughModule;
pub use sink::SinkModule;
pub use source::SourceModule;

/// Registers the core modules with the engine's registry.
pub fn register_core_nodes(registry: &mut ModuleRegistry) {
    registry.register_source(
        "core::source",
        |_name| Ok(Box::new(SourceModule::new()) as Box<dyn Module>),
        "Emits a numbered stream of frames (params: frames, stream_id, interval_ms, send_eos), \
         or accepts frames from the application when 'frames' is 0.",
    );

    registry.register_with_description(
        "core::passthrough",
        |_name| Ok(Box::new(PassthroughModule) as Box<dyn Module>),
        "Forwards frames unchanged. Useful for pipeline debugging, branching, \
         or as a placeholder during development.",
    );

    registry.register_with_description(
        "core::sink",
        |_name| Ok(Box::new(SinkModule::new()) as Box<dyn Module>),
        "Discards every frame it receives, counting them (params: log_every).",
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn registers_core_classes() {
        let mut registry = ModuleRegistry::new();
        register_core_nodes(&mut registry);

        assert!(registry.is_source("core::source"));
        assert!(!registry.is_source("core::sink"));
        let classes: Vec<String> =
            registry.definitions().into_iter().map(|d| d.class_name).collect();
        assert_eq!(classes, vec!["core::passthrough", "core::sink", "core::source"]);
        assert!(registry.create("core::passthrough", "p").is_ok());
    }
}
