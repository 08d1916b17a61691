// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Module factory registry and discovery.
//!
//! This module provides the factory pattern for creating modules by class name:
//! - [`ModuleRegistry`]: Central registry of all available module classes
//! - [`ModuleDefinition`]: Serializable class metadata for API exposure

use crate::error::{FlowError, Result};
use crate::module::{Module, ModuleFactory};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A serializable representation of a module class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDefinition {
    pub class_name: String,
    /// Human-readable description of what this module does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source classes may appear in a pipeline without any upstream link.
    pub source: bool,
}

#[derive(Clone)]
struct ModuleInfo {
    factory: ModuleFactory,
    description: Option<String>,
    source: bool,
}

/// The ModuleRegistry holds all module classes a pipeline description may refer to.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    info: HashMap<String, ModuleInfo>,
}

impl ModuleRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processing class.
    pub fn register<F>(&mut self, class_name: &str, factory: F)
    where
        F: Fn(&str) -> Result<Box<dyn Module>> + Send + Sync + 'static,
    {
        self.insert(class_name, Arc::new(factory), None, false);
    }

    /// Registers a processing class with a description.
    pub fn register_with_description<F>(
        &mut self,
        class_name: &str,
        factory: F,
        description: impl Into<String>,
    ) where
        F: Fn(&str) -> Result<Box<dyn Module>> + Send + Sync + 'static,
    {
        self.insert(class_name, Arc::new(factory), Some(description.into()), false);
    }

    /// Registers a source class: one that produces frames and needs no upstream link.
    pub fn register_source<F>(
        &mut self,
        class_name: &str,
        factory: F,
        description: impl Into<String>,
    ) where
        F: Fn(&str) -> Result<Box<dyn Module>> + Send + Sync + 'static,
    {
        self.insert(class_name, Arc::new(factory), Some(description.into()), true);
    }

    fn insert(
        &mut self,
        class_name: &str,
        factory: ModuleFactory,
        description: Option<String>,
        source: bool,
    ) {
        if self
            .info
            .insert(class_name.to_string(), ModuleInfo { factory, description, source })
            .is_some()
        {
            tracing::warn!(class_name, "Module class registered twice; keeping the latest");
        }
    }

    /// Creates an instance of `class_name` named `module_name`.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if the class is not registered,
    /// or whatever the class factory returns.
    pub fn create(&self, class_name: &str, module_name: &str) -> Result<Box<dyn Module>> {
        self.info.get(class_name).map_or_else(
            || {
                Err(FlowError::Configuration(format!(
                    "Module class '{class_name}' not found in registry"
                )))
            },
            |info| (info.factory)(module_name),
        )
    }

    /// Checks whether a class is registered.
    pub fn contains(&self, class_name: &str) -> bool {
        self.info.contains_key(class_name)
    }

    /// Whether `class_name` is a registered source class.
    pub fn is_source(&self, class_name: &str) -> bool {
        self.info.get(class_name).is_some_and(|info| info.source)
    }

    /// Removes a class. Returns true if it was registered.
    pub fn unregister(&mut self, class_name: &str) -> bool {
        self.info.remove(class_name).is_some()
    }

    /// Returns definitions for all registered classes, sorted by class name.
    pub fn definitions(&self) -> Vec<ModuleDefinition> {
        let mut defs: Vec<ModuleDefinition> = self
            .info
            .iter()
            .map(|(class_name, info)| ModuleDefinition {
                class_name: class_name.clone(),
                description: info.description.clone(),
                source: info.source,
            })
            .collect();
        defs.sort_by(|a, b| a.class_name.cmp(&b.class_name));
        defs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::frame::SharedFrame;

    struct Nop;

    impl Module for Nop {
        fn process(&self, _frame: &SharedFrame) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn create_by_class_name() {
        let mut registry = ModuleRegistry::new();
        registry.register("test::nop", |_| Ok(Box::new(Nop) as Box<dyn Module>));

        assert!(registry.contains("test::nop"));
        assert!(!registry.is_source("test::nop"));
        assert!(registry.create("test::nop", "n1").is_ok());

        let err = registry.create("test::missing", "n2").err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("Configuration error: Module class 'test::missing' not found in registry")
        );
    }

    #[test]
    fn definitions_are_sorted_and_flag_sources() {
        let mut registry = ModuleRegistry::new();
        registry.register_with_description(
            "b::sink",
            |_| Ok(Box::new(Nop) as Box<dyn Module>),
            "drains",
        );
        registry.register_source("a::source", |_| Ok(Box::new(Nop) as Box<dyn Module>), "emits");

        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].class_name, "a::source");
        assert!(defs[0].source);
        assert_eq!(defs[1].description.as_deref(), Some("drains"));
        assert!(!defs[1].source);

        assert!(registry.unregister("b::sink"));
        assert!(!registry.contains("b::sink"));
    }
}
