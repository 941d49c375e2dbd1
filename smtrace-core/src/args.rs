//! Trace values and the keyword/positional argument builder
//!
//! Call sites describe an event with a [`TraceItemArgs`] builder:
//!
//! ```rust
//! use smtrace_core::{ObjectRef, TraceItemArgs};
//!
//! let args = TraceItemArgs::new()
//!     .arg(ObjectRef(4))
//!     .arg("ResetCamera")
//!     .kwarg("animate", false);
//! assert_eq!(args.len(), 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::model::ObjectRef;

/// A single traced value
///
/// Serialized untagged, so a JSON event log reads naturally:
/// `true`, `3`, `0.5`, `"text"` or `{"object": 12}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    Object { object: ObjectRef },
}

impl TraceValue {
    /// The referenced object, if this is an object value
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            TraceValue::Object { object } => Some(*object),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TraceValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Equality for change detection: reals compare by bit pattern, so a NaN
    /// matches itself
    pub fn same_as(&self, other: &TraceValue) -> bool {
        match (self, other) {
            (TraceValue::Real(a), TraceValue::Real(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    /// Name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            TraceValue::Bool(_) => "bool",
            TraceValue::Int(_) => "int",
            TraceValue::Real(_) => "real",
            TraceValue::Text(_) => "text",
            TraceValue::Object { .. } => "object",
        }
    }
}

/// Element-wise [`TraceValue::same_as`] over two property values
pub fn same_values(a: &[TraceValue], b: &[TraceValue]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
}

impl From<ObjectRef> for TraceValue {
    fn from(object: ObjectRef) -> Self {
        TraceValue::Object { object }
    }
}

impl From<&str> for TraceValue {
    fn from(s: &str) -> Self {
        TraceValue::Text(s.to_string())
    }
}

impl From<String> for TraceValue {
    fn from(s: String) -> Self {
        TraceValue::Text(s)
    }
}

impl From<i32> for TraceValue {
    fn from(v: i32) -> Self {
        TraceValue::Int(v as i64)
    }
}

impl From<i64> for TraceValue {
    fn from(v: i64) -> Self {
        TraceValue::Int(v)
    }
}

impl From<f64> for TraceValue {
    fn from(v: f64) -> Self {
        TraceValue::Real(v)
    }
}

impl From<bool> for TraceValue {
    fn from(v: bool) -> Self {
        TraceValue::Bool(v)
    }
}

/// One argument: positional when `key` is absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceArg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: TraceValue,
}

/// Ordered arguments of one trace event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgumentSet {
    args: Vec<TraceArg>,
}

impl ArgumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: Option<String>, value: TraceValue) {
        self.args.push(TraceArg { key, value });
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// All arguments in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TraceArg> {
        self.args.iter()
    }

    /// Positional arguments in insertion order
    pub fn positional(&self) -> Vec<&TraceValue> {
        self.args
            .iter()
            .filter(|a| a.key.is_none())
            .map(|a| &a.value)
            .collect()
    }

    /// Look up a named argument; the last value written for `key` wins
    pub fn named(&self, key: &str) -> Option<&TraceValue> {
        self.args
            .iter()
            .rev()
            .find(|a| a.key.as_deref() == Some(key))
            .map(|a| &a.value)
    }

    /// Named arguments with duplicates resolved
    ///
    /// Keys keep the position of their first occurrence, values are the last
    /// one written.
    pub fn named_args(&self) -> Vec<(&str, &TraceValue)> {
        let mut out: Vec<(&str, &TraceValue)> = Vec::new();
        for arg in &self.args {
            let Some(key) = arg.key.as_deref() else {
                continue;
            };
            match out.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = &arg.value,
                None => out.push((key, &arg.value)),
            }
        }
        out
    }
}

/// Fluent builder for the arguments of one trace item
///
/// Not `Clone`: a builder is handed to exactly one [`crate::TraceItem`] by
/// value.
#[derive(Debug, Default)]
pub struct TraceItemArgs {
    args: ArgumentSet,
}

impl TraceItemArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<TraceValue>) -> Self {
        self.args.push(None, value.into());
        self
    }

    /// Append a keyword argument
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<TraceValue>) -> Self {
        self.args.push(Some(key.into()), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn into_set(self) -> ArgumentSet {
        self.args
    }
}
