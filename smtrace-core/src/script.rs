//! Python script rendering
//!
//! The generated script targets `paraview.simple`. This module knows how to
//! spell values as Python literals, how to pick variable names for traced
//! objects and how to assemble the final text.

use std::collections::{HashMap, HashSet};

use crate::args::TraceValue;
use crate::model::{ObjectInfo, ObjectKind, ObjectRef};

/// Header of an incremental trace
pub const TRACE_PREAMBLE: &str = "# trace generated using smtrace\nfrom paraview.simple import *\n";

/// Header of a state dump
pub const STATE_PREAMBLE: &str = "# state file generated using smtrace\nfrom paraview.simple import *\n";

/// Accumulated statements of one session
///
/// Only ever appended to.
#[derive(Debug, Clone)]
pub struct TraceScript {
    preamble: &'static str,
    statements: Vec<String>,
}

impl TraceScript {
    pub fn new(preamble: &'static str) -> Self {
        Self {
            preamble,
            statements: Vec::new(),
        }
    }

    pub fn append(&mut self, statements: impl IntoIterator<Item = String>) {
        self.statements.extend(statements);
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Full text: preamble followed by one statement per line
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.preamble.len() + self.statements.iter().map(|s| s.len() + 1).sum::<usize>(),
        );
        out.push_str(self.preamble);
        for statement in &self.statements {
            out.push_str(statement);
            out.push('\n');
        }
        out
    }
}

/// Python string literal with single quotes
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Python literal for a non-object value
///
/// Returns `None` for object references, which need a variable name.
pub fn scalar_literal(value: &TraceValue) -> Option<String> {
    Some(match value {
        TraceValue::Bool(true) => "True".to_string(),
        TraceValue::Bool(false) => "False".to_string(),
        TraceValue::Int(v) => v.to_string(),
        TraceValue::Real(v) if v.is_nan() => "float('nan')".to_string(),
        TraceValue::Real(v) if v.is_infinite() => {
            if *v > 0.0 {
                "float('inf')".to_string()
            } else {
                "float('-inf')".to_string()
            }
        }
        // Debug keeps the trailing ".0" so the value stays a float in Python
        TraceValue::Real(v) => format!("{:?}", v),
        TraceValue::Text(s) => quote(s),
        TraceValue::Object { .. } => return None,
    })
}

/// Join already-rendered elements of a property value
///
/// One element renders bare, anything else as a list.
pub fn join_elements(elements: Vec<String>) -> String {
    if elements.len() == 1 {
        elements.into_iter().next().unwrap_or_default()
    } else {
        format!("[{}]", elements.join(", "))
    }
}

/// Turn a registration name into a Python identifier in camelCase
///
/// "Sphere1" becomes "sphere1", "Render View 1" becomes "renderView1".
pub fn identifier(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut upper_next = false;
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            if out.is_empty() {
                out.push(c.to_ascii_lowercase());
            } else if upper_next {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
            upper_next = false;
        } else if !out.is_empty() {
            upper_next = true;
        }
    }
    if out.chars().next().map_or(false, |c| c.is_ascii_digit()) {
        out.insert(0, 'a');
    }
    out
}

/// Variable names assigned to traced objects
#[derive(Debug, Default)]
pub struct NameRegistry {
    by_object: HashMap<ObjectRef, String>,
    taken: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object: ObjectRef) -> Option<&str> {
        self.by_object.get(&object).map(String::as_str)
    }

    pub fn contains(&self, object: ObjectRef) -> bool {
        self.by_object.contains_key(&object)
    }

    /// Assign a fresh name derived from `base`
    ///
    /// Names are never reused within a session, even after release.
    pub fn assign(&mut self, object: ObjectRef, base: &str) -> String {
        let base = if base.is_empty() { "obj" } else { base };
        let mut name = base.to_string();
        let mut n = 1;
        while self.taken.contains(&name) || is_reserved(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        self.taken.insert(name.clone());
        self.by_object.insert(object, name.clone());
        name
    }

    /// Forget the object's variable (after a `Delete`)
    pub fn release(&mut self, object: ObjectRef) -> Option<String> {
        self.by_object.remove(&object)
    }
}

/// Base variable name for an object
///
/// Representations are named after their input: "sphere1Display".
pub fn base_name(info: &ObjectInfo, input_name: Option<&str>) -> String {
    match (info.kind, input_name) {
        (ObjectKind::Representation, Some(input)) => format!("{}Display", input),
        (ObjectKind::Supplemental, _) if info.group == "lookup_tables" => {
            format!("{}LUT", identifier(&info.label))
        }
        (ObjectKind::Supplemental, _) if info.group == "piecewise_functions" => {
            format!("{}PWF", identifier(&info.label))
        }
        _ => {
            let from_label = identifier(&info.label);
            if from_label.is_empty() {
                identifier(&info.xml_name)
            } else {
                from_label
            }
        }
    }
}

/// Whether `name` can be written as a Python name (not a keyword)
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_reserved(name)
}

fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        "and" | "as" | "assert" | "async" | "await" | "break" | "class" | "continue" | "def"
            | "del" | "elif" | "else" | "except" | "finally" | "for" | "from" | "global"
            | "if" | "import" | "in" | "is" | "lambda" | "nonlocal" | "not" | "or" | "pass"
            | "raise" | "return" | "try" | "while" | "with" | "yield" | "None" | "True"
            | "False"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_literals() {
        assert_eq!(scalar_literal(&TraceValue::Bool(true)).unwrap(), "True");
        assert_eq!(scalar_literal(&TraceValue::Int(-3)).unwrap(), "-3");
        assert_eq!(scalar_literal(&TraceValue::Real(2.0)).unwrap(), "2.0");
        assert_eq!(scalar_literal(&TraceValue::Real(0.25)).unwrap(), "0.25");
        assert_eq!(scalar_literal(&TraceValue::Real(f64::NAN)).unwrap(), "float('nan')");
        assert_eq!(
            scalar_literal(&TraceValue::Real(f64::NEG_INFINITY)).unwrap(),
            "float('-inf')"
        );
        assert!(scalar_literal(&TraceValue::Object { object: ObjectRef(1) }).is_none());
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote("a\\b"), r"'a\\b'");
        assert_eq!(quote("line\nbreak"), r"'line\nbreak'");
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("Sphere1"), "sphere1");
        assert_eq!(identifier("RenderView1"), "renderView1");
        assert_eq!(identifier("my data.vtk"), "myDataVtk");
        assert_eq!(identifier("3D Glyphs"), "a3DGlyphs");
        assert_eq!(identifier("--"), "");
    }

    #[test]
    fn test_join_elements() {
        assert_eq!(join_elements(vec!["1".into()]), "1");
        assert_eq!(join_elements(vec!["1".into(), "2".into()]), "[1, 2]");
        assert_eq!(join_elements(vec![]), "[]");
    }

    #[test]
    fn test_names_are_unique_and_not_reused() {
        let mut names = NameRegistry::new();
        assert_eq!(names.assign(ObjectRef(1), "sphere1"), "sphere1");
        assert_eq!(names.assign(ObjectRef(2), "sphere1"), "sphere1_1");

        names.release(ObjectRef(1));
        assert!(!names.contains(ObjectRef(1)));
        assert_eq!(names.assign(ObjectRef(3), "sphere1"), "sphere1_2");
        assert_eq!(names.assign(ObjectRef(4), "del"), "del_1");
        assert_eq!(names.assign(ObjectRef(5), "await"), "await_1");
        assert_eq!(names.assign(ObjectRef(6), "nonlocal"), "nonlocal_1");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("ImageResolution"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2d"));
        assert!(!is_identifier("with space"));
        assert!(!is_identifier("class"));
        assert!(!is_identifier("async"));
    }

    #[test]
    fn test_base_names() {
        let rep = ObjectInfo::representation(ObjectRef(3), ObjectRef(1), ObjectRef(2), "Rep");
        assert_eq!(base_name(&rep, Some("sphere1")), "sphere1Display");

        let lut = ObjectInfo::supplemental(ObjectRef(4), "lookup_tables", "PVLookupTable", "RTData");
        assert_eq!(base_name(&lut, None), "rTDataLUT");

        let unnamed = ObjectInfo::source(ObjectRef(5), "Wavelet", "");
        assert_eq!(base_name(&unnamed, None), "wavelet");
    }

    #[test]
    fn test_script_render() {
        let mut script = TraceScript::new(TRACE_PREAMBLE);
        assert_eq!(script.render(), TRACE_PREAMBLE);

        script.append(vec!["a = 1".to_string(), "b = 2".to_string()]);
        assert_eq!(script.len(), 2);
        assert_eq!(script.render(), format!("{}a = 1\nb = 2\n", TRACE_PREAMBLE));
    }
}
