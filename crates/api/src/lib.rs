// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! api: Defines the pipeline description format for FlowKit.
//!
//! A description is a single object keyed by module name:
//!
//! ```json
//! {
//!   "source":  { "class_name": "core::source", "parallelism": 0, "next_modules": ["detect"] },
//!   "detect":  { "class_name": "core::passthrough", "parallelism": 2,
//!                "max_input_queue_size": 5, "next_modules": ["sink"] },
//!   "sink":    { "class_name": "core::sink", "custom_params": { "log_every": 100 } }
//! }
//! ```
//!
//! The same structure is accepted as YAML. See [`loader`] for reading descriptions from disk.

use flowkit_core::error::Result;
use flowkit_core::{FlowError, InputMode, ModuleParams};
use indexmap::IndexMap;
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fmt;

pub mod loader;

pub use loader::{ConfigFormat, JSON_FILE_DIR_PARAM};

/// Default capacity of each input conveyor of a module.
pub const DEFAULT_MAX_INPUT_QUEUE_SIZE: usize = 20;

/// Default worker count of a module.
pub const DEFAULT_PARALLELISM: usize = 1;

/// Top-level key reserved for profiler settings. Accepted and ignored.
pub const PROFILER_CONFIG_KEY: &str = "profiler_config";

const fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

const fn default_queue_size() -> usize {
    DEFAULT_MAX_INPUT_QUEUE_SIZE
}

/// The description of one module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModuleConfig {
    /// Registered class to instantiate (e.g. `core::passthrough`).
    pub class_name: String,
    /// Number of worker threads. Source modules may use 0.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Capacity of each input conveyor.
    #[serde(default = "default_queue_size")]
    pub max_input_queue_size: usize,
    /// Successor module names.
    #[serde(default)]
    pub next_modules: Vec<String>,
    /// Opaque parameters handed to the module on open.
    /// Non-string values are kept as their compact JSON text.
    #[serde(default, deserialize_with = "deserialize_params")]
    pub custom_params: ModuleParams,
    /// Backpressure policy of this module's input conveyors.
    #[serde(default)]
    pub input_mode: InputMode,
}

impl ModuleConfig {
    /// A config with defaults for everything but the class name.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            parallelism: DEFAULT_PARALLELISM,
            max_input_queue_size: DEFAULT_MAX_INPUT_QUEUE_SIZE,
            next_modules: Vec::new(),
            custom_params: ModuleParams::new(),
            input_mode: InputMode::default(),
        }
    }
}

fn deserialize_params<'de, D>(deserializer: D) -> std::result::Result<ModuleParams, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

/// A whole pipeline description. Module order follows the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    pub modules: IndexMap<String, ModuleConfig>,
}

impl<'de> Deserialize<'de> for PipelineConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ModulesVisitor;

        impl<'de> Visitor<'de> for ModulesVisitor {
            type Value = PipelineConfig;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of module names to module descriptions")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut modules = IndexMap::new();
                while let Some(name) = map.next_key::<String>()? {
                    if name == PROFILER_CONFIG_KEY {
                        map.next_value::<IgnoredAny>()?;
                        continue;
                    }
                    let config: ModuleConfig = map.next_value()?;
                    if modules.contains_key(&name) {
                        return Err(de::Error::custom(format!("duplicate module name '{name}'")));
                    }
                    modules.insert(name, config);
                }
                Ok(PipelineConfig { modules })
            }
        }

        deserializer.deserialize_map(ModulesVisitor)
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON description.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` on malformed JSON or a description that fails
    /// [`PipelineConfig::validate`].
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            FlowError::Configuration(format!("Failed to parse pipeline description: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML description.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` on malformed YAML or a description that fails
    /// [`PipelineConfig::validate`].
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_saphyr::from_str(text).map_err(|e| {
            FlowError::Configuration(format!("Failed to parse pipeline description: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the description is self-consistent.
    ///
    /// Class names must be non-empty, queue sizes positive, every `next_modules` entry must
    /// name a module of this description, and no link may be listed twice.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        for (name, module) in &self.modules {
            if module.class_name.trim().is_empty() {
                return Err(FlowError::Configuration(format!(
                    "Module '{name}' has an empty class_name"
                )));
            }
            if module.max_input_queue_size == 0 {
                return Err(FlowError::Configuration(format!(
                    "Module '{name}': max_input_queue_size must be greater than 0"
                )));
            }
            let mut seen = HashSet::new();
            for next in &module.next_modules {
                if !self.modules.contains_key(next) {
                    return Err(FlowError::Configuration(format!(
                        "Module '{name}' references non-existent module '{next}' in 'next_modules'"
                    )));
                }
                if !seen.insert(next.as_str()) {
                    return Err(FlowError::Configuration(format!(
                        "Module '{name}' lists '{next}' more than once in 'next_modules'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every `(upstream, downstream)` pair, in description order.
    pub fn links(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.modules.iter().flat_map(|(name, module)| {
            module.next_modules.iter().map(move |next| (name.as_str(), next.as_str()))
        })
    }

    /// Names of modules that no other module lists as a successor.
    pub fn roots(&self) -> Vec<&str> {
        let linked: HashSet<&str> = self.links().map(|(_, down)| down).collect();
        self.modules.keys().map(String::as_str).filter(|name| !linked.contains(name)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LINEAR: &str = r#"{
        "source": { "class_name": "core::source", "parallelism": 0, "next_modules": ["transform"] },
        "transform": {
            "class_name": "core::passthrough",
            "parallelism": 2,
            "max_input_queue_size": 5,
            "next_modules": ["sink"]
        },
        "sink": {
            "class_name": "core::sink",
            "custom_params": { "label": "out", "log_every": 100, "tags": ["a", "b"] },
            "input_mode": "best_effort"
        },
        "profiler_config": { "enable_profiling": true }
    }"#;

    #[test]
    fn parses_linear_description_with_defaults() {
        let config = PipelineConfig::from_json_str(LINEAR).unwrap();
        assert_eq!(config.modules.keys().collect::<Vec<_>>(), vec!["source", "transform", "sink"]);

        let transform = &config.modules["transform"];
        assert_eq!(transform.parallelism, 2);
        assert_eq!(transform.max_input_queue_size, 5);
        assert_eq!(transform.input_mode, InputMode::Reliable);

        let sink = &config.modules["sink"];
        assert_eq!(sink.parallelism, DEFAULT_PARALLELISM);
        assert_eq!(sink.max_input_queue_size, DEFAULT_MAX_INPUT_QUEUE_SIZE);
        assert_eq!(sink.input_mode, InputMode::BestEffort);
        assert!(sink.next_modules.is_empty());
    }

    #[test]
    fn non_string_params_become_compact_json() {
        let config = PipelineConfig::from_json_str(LINEAR).unwrap();
        let params = &config.modules["sink"].custom_params;
        assert_eq!(params["label"], "out");
        assert_eq!(params["log_every"], "100");
        assert_eq!(params["tags"], r#"["a","b"]"#);
    }

    #[test]
    fn links_and_roots() {
        let config = PipelineConfig::from_json_str(LINEAR).unwrap();
        assert_eq!(
            config.links().collect::<Vec<_>>(),
            vec![("source", "transform"), ("transform", "sink")]
        );
        assert_eq!(config.roots(), vec!["source"]);
    }

    #[test]
    fn unknown_next_module_is_rejected() {
        let err = PipelineConfig::from_json_str(
            r#"{ "a": { "class_name": "core::source", "next_modules": ["ghost"] } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-existent module 'ghost'"));
    }

    #[test]
    fn duplicate_module_name_is_rejected() {
        let err = PipelineConfig::from_json_str(
            r#"{ "a": { "class_name": "x" }, "a": { "class_name": "y" } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate module name 'a'"));
    }

    #[test]
    fn missing_class_name_is_rejected() {
        assert!(PipelineConfig::from_json_str(r#"{ "a": { "parallelism": 1 } }"#).is_err());
    }

    #[test]
    fn zero_queue_size_is_rejected() {
        let err = PipelineConfig::from_json_str(
            r#"{ "a": { "class_name": "x", "max_input_queue_size": 0 } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_input_queue_size"));
    }

    #[test]
    fn repeated_successor_is_rejected() {
        let err = PipelineConfig::from_json_str(
            r#"{
                "a": { "class_name": "x", "next_modules": ["b", "b"] },
                "b": { "class_name": "y" }
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn parses_yaml_description() {
        let yaml = r"
source:
  class_name: core::source
  parallelism: 0
  next_modules: [sink]
  custom_params:
    frames: 10
    stream_id: cam-1
sink:
  class_name: core::sink
";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.modules.len(), 2);
        let source = &config.modules["source"];
        assert_eq!(source.parallelism, 0);
        assert_eq!(source.custom_params["frames"], "10");
        assert_eq!(source.custom_params["stream_id"], "cam-1");
        assert_eq!(config.links().collect::<Vec<_>>(), vec![("source", "sink")]);
    }
}
