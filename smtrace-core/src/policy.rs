//! Recording policy

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TraceError;

/// Which properties are written when an object is first traced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertiesToTrace {
    /// Every property, including those at their defaults
    All = 0,
    /// Properties that differ from their declared defaults
    #[default]
    Modified = 1,
    /// Properties changed through the user pathway
    UserModified = 2,
}

impl PropertiesToTrace {
    /// Convert from the integer form, clamping out-of-range values
    pub fn from_i32_clamped(value: i32) -> Self {
        match value {
            i32::MIN..=0 => PropertiesToTrace::All,
            1 => PropertiesToTrace::Modified,
            _ => PropertiesToTrace::UserModified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertiesToTrace::All => "all",
            PropertiesToTrace::Modified => "modified",
            PropertiesToTrace::UserModified => "user_modified",
        }
    }
}

impl fmt::Display for PropertiesToTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertiesToTrace {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "all" => Ok(PropertiesToTrace::All),
            "modified" => Ok(PropertiesToTrace::Modified),
            "user_modified" => Ok(PropertiesToTrace::UserModified),
            other => other
                .parse::<i32>()
                .map(PropertiesToTrace::from_i32_clamped)
                .map_err(|_| TraceError::InvalidConfig {
                    reason: format!(
                        "unknown properties-to-trace value '{}' (expected all, modified or user_modified)",
                        s
                    ),
                }),
        }
    }
}

/// Verbosity policy of a tracer
///
/// Changes apply to events recorded after the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePolicy {
    /// Write every property when an object is created, including XML defaults
    #[serde(default)]
    pub trace_xml_defaults: bool,

    /// Echo rendered statements to the diagnostic sink
    #[serde(default)]
    pub log_to_stdout: bool,

    #[serde(default)]
    pub properties_to_trace_on_create: PropertiesToTrace,

    /// Dump properties of supplemental objects the first time they are seen
    #[serde(default)]
    pub fully_trace_supplemental_proxies: bool,
}

impl Default for TracePolicy {
    fn default() -> Self {
        Self {
            trace_xml_defaults: false,
            log_to_stdout: false,
            properties_to_trace_on_create: PropertiesToTrace::Modified,
            fully_trace_supplemental_proxies: false,
        }
    }
}

impl TracePolicy {
    /// The filter applied to creation-time property dumps
    pub fn creation_filter(&self) -> PropertiesToTrace {
        if self.trace_xml_defaults {
            PropertiesToTrace::All
        } else {
            self.properties_to_trace_on_create
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(PropertiesToTrace::from_i32_clamped(-4), PropertiesToTrace::All);
        assert_eq!(PropertiesToTrace::from_i32_clamped(0), PropertiesToTrace::All);
        assert_eq!(PropertiesToTrace::from_i32_clamped(1), PropertiesToTrace::Modified);
        assert_eq!(PropertiesToTrace::from_i32_clamped(2), PropertiesToTrace::UserModified);
        assert_eq!(PropertiesToTrace::from_i32_clamped(42), PropertiesToTrace::UserModified);
    }

    #[test]
    fn test_parse() {
        assert_eq!("all".parse::<PropertiesToTrace>().unwrap(), PropertiesToTrace::All);
        assert_eq!(
            "User-Modified".parse::<PropertiesToTrace>().unwrap(),
            PropertiesToTrace::UserModified
        );
        assert_eq!("1".parse::<PropertiesToTrace>().unwrap(), PropertiesToTrace::Modified);
        assert!("sometimes".parse::<PropertiesToTrace>().is_err());
    }

    #[test]
    fn test_defaults() {
        let policy = TracePolicy::default();
        assert!(!policy.trace_xml_defaults);
        assert!(!policy.log_to_stdout);
        assert!(!policy.fully_trace_supplemental_proxies);
        assert_eq!(policy.properties_to_trace_on_create, PropertiesToTrace::Modified);
    }

    #[test]
    fn test_xml_defaults_widen_creation_filter() {
        let mut policy = TracePolicy {
            properties_to_trace_on_create: PropertiesToTrace::UserModified,
            ..Default::default()
        };
        assert_eq!(policy.creation_filter(), PropertiesToTrace::UserModified);
        policy.trace_xml_defaults = true;
        assert_eq!(policy.creation_filter(), PropertiesToTrace::All);
    }

    #[test]
    fn test_policy_json_defaults() {
        let policy: TracePolicy = serde_json::from_str(r#"{"log_to_stdout": true}"#).unwrap();
        assert!(policy.log_to_stdout);
        assert_eq!(policy.properties_to_trace_on_create, PropertiesToTrace::Modified);
    }
}
