// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Reading pipeline descriptions from disk.
//!
//! The format is picked by file extension. Every module additionally receives the
//! [`JSON_FILE_DIR_PARAM`] parameter so it can resolve paths relative to the description.

use crate::PipelineConfig;
use flowkit_core::error::Result;
use flowkit_core::FlowError;
use std::path::Path;

/// Parameter injected into every module: the description's directory, with a trailing `/`.
pub const JSON_FILE_DIR_PARAM: &str = "json_file_dir";

/// Supported description formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` for anything other than `.json`, `.yaml` or `.yml`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(FlowError::Configuration(format!(
                "Unsupported pipeline description file '{}': expected .json, .yaml or .yml",
                path.display()
            ))),
        }
    }
}

impl PipelineConfig {
    /// Parses a description in the given format.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if the text is malformed or fails validation.
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Json => Self::from_json_str(text),
            ConfigFormat::Yaml => Self::from_yaml_str(text),
        }
    }

    /// Reads, parses and validates a description file, then injects [`JSON_FILE_DIR_PARAM`].
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Io` if the file cannot be read, `FlowError::Configuration` otherwise.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&text, format)?;

        let dir = match path.parent().and_then(Path::to_str) {
            Some("") | None => "./".to_string(),
            Some(dir) if dir.ends_with('/') => dir.to_string(),
            Some(dir) => format!("{dir}/"),
        };
        config.inject_param(JSON_FILE_DIR_PARAM, &dir);

        tracing::info!(
            path = %path.display(),
            modules = config.modules.len(),
            "Loaded pipeline description"
        );
        Ok(config)
    }

    /// Sets `key` to `value` in every module's params, warning when a user value is replaced.
    pub fn inject_param(&mut self, key: &str, value: &str) {
        for (name, module) in &mut self.modules {
            let previous = module.custom_params.insert(key.to_string(), value.to_string());
            if let Some(previous) = previous {
                if previous != value {
                    tracing::warn!(
                        module = %name,
                        key,
                        previous = %previous,
                        "Parameter is reserved and was overwritten"
                    );
                }
            }
        }
    }
}
