// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Utility functions for module parameters.
//!
//! Pipeline descriptions hand modules a flat string map. Values that were not strings in the
//! description arrive as compact JSON text, so [`params_helpers`] can turn the map back into a
//! typed config struct.

/// Helper functions for parsing module parameters.
pub mod params_helpers {
    use crate::error::{FlowError, Result};
    use crate::module::ModuleParams;
    use serde::Deserialize;
    use std::str::FromStr;

    /// Rebuilds a JSON object from a parameter map.
    ///
    /// Each value is parsed as JSON when possible, otherwise kept as a string.
    pub fn params_to_json(params: &ModuleParams) -> serde_json::Value {
        let object = params
            .iter()
            .map(|(key, raw)| {
                let value = serde_json::from_str(raw)
                    .unwrap_or_else(|_| serde_json::Value::String(raw.clone()));
                (key.clone(), value)
            })
            .collect();
        serde_json::Value::Object(object)
    }

    /// Parses parameters into `T`, falling back to `T::default()` if they do not fit.
    /// This is the preferred approach for modules with sensible defaults.
    pub fn parse_params_optional<T>(params: &ModuleParams) -> T
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        serde_json::from_value(params_to_json(params)).unwrap_or_default()
    }

    /// Parses parameters into `T`.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if deserialization fails.
    pub fn parse_params_required<T>(params: &ModuleParams) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        serde_json::from_value(params_to_json(params))
            .map_err(|e| FlowError::Configuration(format!("Failed to parse params: {e}")))
    }

    /// Reads a single parameter and parses it with `FromStr`.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Configuration` if the value is present but does not parse.
    pub fn get_parsed<T>(params: &ModuleParams, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        params
            .get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    FlowError::Configuration(format!("Invalid value '{raw}' for '{key}': {e}"))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::params_helpers::*;
    use crate::module::ModuleParams;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct SourceParams {
        frames: u64,
        stream_id: String,
        labels: Vec<String>,
    }

    fn params(pairs: &[(&str, &str)]) -> ModuleParams {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn typed_params_from_flat_map() {
        let parsed: SourceParams = parse_params_required(&params(&[
            ("frames", "100"),
            ("stream_id", "s1"),
            ("labels", r#"["a","b"]"#),
        ]))
        .unwrap();
        assert_eq!(
            parsed,
            SourceParams {
                frames: 100,
                stream_id: "s1".to_string(),
                labels: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn optional_falls_back_to_default() {
        let parsed: SourceParams = parse_params_optional(&params(&[("frames", "many")]));
        assert_eq!(parsed, SourceParams::default());
    }

    #[test]
    fn get_parsed_reports_bad_values() {
        let map = params(&[("depth", " 8 "), ("ratio", "x")]);
        assert_eq!(get_parsed::<u32>(&map, "depth").unwrap(), Some(8));
        assert_eq!(get_parsed::<u32>(&map, "absent").unwrap(), None);
        assert!(get_parsed::<f64>(&map, "ratio").is_err());
    }
}
