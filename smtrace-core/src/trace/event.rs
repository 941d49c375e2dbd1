//! Trace events and the item types the engine understands

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::args::{ArgumentSet, TraceItemArgs};
use crate::error::{Result, TraceError};

/// One event handed from a trace item to the engine
///
/// Serialized form (one per line in an event log):
/// `{"type": "Show", "args": [{"key": "producer", "value": {"object": 1}}]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    #[serde(rename = "type")]
    pub item_type: String,

    #[serde(default)]
    pub args: ArgumentSet,
}

impl TraceEvent {
    pub fn new(item_type: impl Into<String>, args: TraceItemArgs) -> Self {
        Self {
            item_type: item_type.into(),
            args: args.into_set(),
        }
    }

    pub fn from_set(item_type: impl Into<String>, args: ArgumentSet) -> Self {
        Self {
            item_type: item_type.into(),
            args,
        }
    }

    /// Parse a JSON Lines event log, skipping blank lines
    pub fn parse_jsonl(jsonl: &str) -> Result<Vec<TraceEvent>> {
        jsonl
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| TraceError::InvalidConfig {
                    reason: format!("event log line {}: {}", n + 1, e),
                })
            })
            .collect()
    }
}

/// Item types with a known script rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceItemKind {
    /// `proxy`: a pipeline source or filter was created
    RegisterPipelineProxy,
    /// `proxy`: a view was created
    RegisterViewProxy,
    /// `producer`, optional `view`, optional `display`
    Show,
    /// `producer`, optional `view`
    Hide,
    /// `proxy`
    Delete,
    /// `source`
    SetActiveSource,
    /// `view`
    SetActiveView,
    /// `proxy`, optional `comment`
    PropertiesModified,
    /// positional: object, method name, arguments; named: keyword arguments
    CallMethod,
    /// positional: function name, arguments; named: keyword arguments
    CallFunction,
    /// positional: raw text
    TraceText,
}

impl TraceItemKind {
    pub const ALL: [TraceItemKind; 11] = [
        TraceItemKind::RegisterPipelineProxy,
        TraceItemKind::RegisterViewProxy,
        TraceItemKind::Show,
        TraceItemKind::Hide,
        TraceItemKind::Delete,
        TraceItemKind::SetActiveSource,
        TraceItemKind::SetActiveView,
        TraceItemKind::PropertiesModified,
        TraceItemKind::CallMethod,
        TraceItemKind::CallFunction,
        TraceItemKind::TraceText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TraceItemKind::RegisterPipelineProxy => "RegisterPipelineProxy",
            TraceItemKind::RegisterViewProxy => "RegisterViewProxy",
            TraceItemKind::Show => "Show",
            TraceItemKind::Hide => "Hide",
            TraceItemKind::Delete => "Delete",
            TraceItemKind::SetActiveSource => "SetActiveSource",
            TraceItemKind::SetActiveView => "SetActiveView",
            TraceItemKind::PropertiesModified => "PropertiesModified",
            TraceItemKind::CallMethod => "CallMethod",
            TraceItemKind::CallFunction => "CallFunction",
            TraceItemKind::TraceText => "TraceText",
        }
    }
}

impl fmt::Display for TraceItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraceItemKind {
    type Err = TraceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TraceItemKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TraceError::render(format!("unknown trace item type '{}'", s)))
    }
}
