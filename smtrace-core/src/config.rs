//! Configuration for smtrace
//!
//! Loaded from a JSON file, then optionally overridden from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SMTRACE_LOG_TO_STDOUT` | `policy.log_to_stdout` |
//! | `SMTRACE_TRACE_XML_DEFAULTS` | `policy.trace_xml_defaults` |
//! | `SMTRACE_PROPERTIES_ON_CREATE` | `policy.properties_to_trace_on_create` |
//! | `SMTRACE_FULLY_TRACE_SUPPLEMENTAL` | `policy.fully_trace_supplemental_proxies` |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::policy::{PropertiesToTrace, TracePolicy};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Policy given to every newly started tracer
    #[serde(default)]
    pub policy: TracePolicy,

    /// Defaults for state dumps
    #[serde(default)]
    pub state: StateConfig,
}

/// State dump defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub properties_to_trace_on_create: PropertiesToTrace,

    #[serde(default = "default_true")]
    pub skip_hidden_representations: bool,
}

fn default_true() -> bool { true }

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            properties_to_trace_on_create: PropertiesToTrace::Modified,
            skip_hidden_representations: true,
        }
    }
}

impl TraceConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TraceError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TraceError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json(&content)
    }

    /// Apply `SMTRACE_*` overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup("SMTRACE_LOG_TO_STDOUT") {
            self.policy.log_to_stdout = parse_bool("SMTRACE_LOG_TO_STDOUT", &v)?;
        }
        if let Some(v) = lookup("SMTRACE_TRACE_XML_DEFAULTS") {
            self.policy.trace_xml_defaults = parse_bool("SMTRACE_TRACE_XML_DEFAULTS", &v)?;
        }
        if let Some(v) = lookup("SMTRACE_PROPERTIES_ON_CREATE") {
            self.policy.properties_to_trace_on_create = v.parse()?;
        }
        if let Some(v) = lookup("SMTRACE_FULLY_TRACE_SUPPLEMENTAL") {
            self.policy.fully_trace_supplemental_proxies =
                parse_bool("SMTRACE_FULLY_TRACE_SUPPLEMENTAL", &v)?;
        }
        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(TraceError::InvalidConfig {
            reason: format!("{} must be a boolean, got '{}'", key, other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config = TraceConfig::from_json("{}").unwrap();
        assert_eq!(config, TraceConfig::default());
        assert!(config.state.skip_hidden_representations);
    }

    #[test]
    fn test_partial_json() {
        let config = TraceConfig::from_json(
            r#"{"policy": {"properties_to_trace_on_create": "all"},
                "state": {"skip_hidden_representations": false}}"#,
        )
        .unwrap();
        assert_eq!(config.policy.properties_to_trace_on_create, PropertiesToTrace::All);
        assert!(!config.policy.log_to_stdout);
        assert!(!config.state.skip_hidden_representations);
    }

    #[test]
    fn test_invalid_json() {
        let err = TraceConfig::from_json("{\"policy\": 3}").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_overrides() {
        let config = TraceConfig::default()
            .with_overrides(lookup(&[
                ("SMTRACE_LOG_TO_STDOUT", "yes"),
                ("SMTRACE_PROPERTIES_ON_CREATE", "user-modified"),
                ("SMTRACE_FULLY_TRACE_SUPPLEMENTAL", "1"),
            ]))
            .unwrap();
        assert!(config.policy.log_to_stdout);
        assert!(!config.policy.trace_xml_defaults);
        assert!(config.policy.fully_trace_supplemental_proxies);
        assert_eq!(
            config.policy.properties_to_trace_on_create,
            PropertiesToTrace::UserModified
        );
    }

    #[test]
    fn test_bad_override() {
        let err = TraceConfig::default()
            .with_overrides(lookup(&[("SMTRACE_TRACE_XML_DEFAULTS", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("SMTRACE_TRACE_XML_DEFAULTS"));
    }

    #[test]
    fn test_missing_file() {
        let err = TraceConfig::from_file("/nonexistent/smtrace.json").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
