// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for FlowKit.
//!
//! Only build-time and lifecycle failures surface as `Err` values. Per-frame processing
//! failures travel asynchronously over the event bus and end up as stream messages.

use thiserror::Error;

/// Main error type for FlowKit operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Configuration or graph validation error.
    ///
    /// Examples:
    /// - Duplicate module name
    /// - Link to an unknown module
    /// - Cyclic graph
    /// - Malformed pipeline description
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Runtime error during normal operation (thread spawn failure, stopped bus, ...).
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A module refused to open during `Pipeline::start`.
    #[error("Module '{module}' failed to open: {reason}")]
    ModuleOpen { module: String, reason: String },

    /// A module failed to process a frame.
    ///
    /// Returned by `Module::process`; the engine turns it into an `Error` event.
    #[error("Module '{module}' failed to process frame: {reason}")]
    Process { module: String, reason: String },

    /// I/O error (reading a pipeline description from disk).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Shorthand for a processing failure.
    pub fn process(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Process { module: module.into(), reason: reason.into() }
    }
}

/// Convenience type alias for Results using `FlowError`.
pub type Result<T> = std::result::Result<T, FlowError>;

impl From<FlowError> for String {
    fn from(err: FlowError) -> Self {
        err.to_string()
    }
}

// Generic string errors default to Runtime.
impl From<String> for FlowError {
    fn from(s: String) -> Self {
        Self::Runtime(s)
    }
}

impl From<&str> for FlowError {
    fn from(s: &str) -> Self {
        Self::Runtime(s.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowError::Configuration("duplicate module 'decoder'".to_string());
        assert_eq!(err.to_string(), "Configuration error: duplicate module 'decoder'");

        let err =
            FlowError::ModuleOpen { module: "osd".to_string(), reason: "no font".to_string() };
        assert_eq!(err.to_string(), "Module 'osd' failed to open: no font");
    }

    #[test]
    fn test_process_shorthand() {
        let err = FlowError::process("infer", "bad tensor");
        assert!(matches!(err, FlowError::Process { ref module, .. } if module == "infer"));
    }

    #[test]
    fn test_string_to_error_conversion() {
        let err: FlowError = "Something went wrong".into();
        assert_eq!(err.to_string(), "Runtime error: Something went wrong");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: FlowError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("File not found"));
    }
}
