//! Object model capability
//!
//! The tracer never owns the objects it traces. It reaches the application's
//! live object graph through the [`ObjectModel`] trait: enumerate objects,
//! read their properties and ask whether a property still holds its declared
//! default.
//!
//! [`InMemoryObjectModel`] is a self-contained implementation. It backs the
//! tests and the CLI, and can be loaded from a JSON description of an object
//! graph.
//!
//! # Example
//!
//! ```rust
//! use smtrace_core::model::{InMemoryObjectModel, ObjectInfo, ObjectModel, ObjectRef, PropertyState};
//!
//! let model = InMemoryObjectModel::new();
//! let sphere = model.add_object(
//!     ObjectInfo::source(ObjectRef(1), "Sphere", "Sphere1"),
//!     vec![PropertyState::new("Radius", 0.5)],
//! );
//! model.set_property_by_user(sphere, "Radius", vec![1.0.into()]).unwrap();
//! assert!(!model.is_at_default(sphere, "Radius"));
//! assert!(model.is_user_modified(sphere, "Radius"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::args::{same_values, TraceValue};
use crate::error::{Result, TraceError};

/// Opaque handle to a live object in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(pub u64);

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What role an object plays in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Pipeline source or filter created by the user
    Source,
    /// A view
    View,
    /// Representation of a source in a view
    Representation,
    /// Helper created by the application (lookup tables, scalar bars, ...)
    Supplemental,
}

/// Static description of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: ObjectRef,

    /// Registration group (e.g. "sources", "views", "lookup_tables")
    pub group: String,

    /// Type name, used as the constructor in the generated script
    pub xml_name: String,

    /// Registration name (e.g. "Sphere1")
    pub label: String,

    pub kind: ObjectKind,

    /// Representations only: hidden in its view
    #[serde(default)]
    pub hidden: bool,

    /// Representations only: the represented source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<ObjectRef>,

    /// Representations only: the view it belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<ObjectRef>,
}

impl ObjectInfo {
    fn with_kind(
        id: ObjectRef,
        group: &str,
        xml_name: impl Into<String>,
        label: impl Into<String>,
        kind: ObjectKind,
    ) -> Self {
        Self {
            id,
            group: group.to_string(),
            xml_name: xml_name.into(),
            label: label.into(),
            kind,
            hidden: false,
            input: None,
            view: None,
        }
    }

    pub fn source(id: ObjectRef, xml_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_kind(id, "sources", xml_name, label, ObjectKind::Source)
    }

    pub fn view(id: ObjectRef, xml_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_kind(id, "views", xml_name, label, ObjectKind::View)
    }

    pub fn representation(
        id: ObjectRef,
        input: ObjectRef,
        view: ObjectRef,
        label: impl Into<String>,
    ) -> Self {
        let mut info = Self::with_kind(
            id,
            "representations",
            "GeometryRepresentation",
            label,
            ObjectKind::Representation,
        );
        info.input = Some(input);
        info.view = Some(view);
        info
    }

    pub fn supplemental(
        id: ObjectRef,
        group: &str,
        xml_name: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self::with_kind(id, group, xml_name, label, ObjectKind::Supplemental)
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// Capability the tracer needs from the application's object graph
///
/// Implementations must be cheap to query; the tracer calls into them while
/// holding its own lock.
pub trait ObjectModel: Send + Sync {
    /// All live objects
    fn objects(&self) -> Vec<ObjectRef>;

    fn info(&self, object: ObjectRef) -> Option<ObjectInfo>;

    /// Property names in declaration order
    fn properties(&self, object: ObjectRef) -> Vec<String>;

    /// Current value of a property (vector properties hold several elements)
    fn value(&self, object: ObjectRef, property: &str) -> Option<Vec<TraceValue>>;

    /// Whether the property currently equals its declared default
    fn is_at_default(&self, object: ObjectRef, property: &str) -> bool;

    /// Whether the property was changed through the user pathway
    fn is_user_modified(&self, object: ObjectRef, property: &str) -> bool;

    fn is_supplemental(&self, object: ObjectRef) -> bool {
        self.info(object)
            .map(|i| i.kind == ObjectKind::Supplemental)
            .unwrap_or(false)
    }

    fn is_hidden_representation(&self, object: ObjectRef) -> bool {
        self.info(object)
            .map(|i| i.kind == ObjectKind::Representation && i.hidden)
            .unwrap_or(false)
    }

    /// Backend name (for logging/debugging)
    fn name(&self) -> &'static str;
}

/// State of one property in the in-memory model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyState {
    pub name: String,
    pub value: Vec<TraceValue>,
    pub default: Vec<TraceValue>,
    #[serde(default)]
    pub user_modified: bool,
}

impl PropertyState {
    /// A single-element property at its default
    pub fn new(name: impl Into<String>, default: impl Into<TraceValue>) -> Self {
        Self::vector(name, vec![default.into()])
    }

    /// A vector property at its default
    pub fn vector(name: impl Into<String>, default: Vec<TraceValue>) -> Self {
        Self {
            name: name.into(),
            value: default.clone(),
            default,
            user_modified: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectEntry {
    #[serde(flatten)]
    info: ObjectInfo,
    #[serde(default)]
    properties: Vec<PropertyState>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ModelDocument {
    objects: Vec<ObjectEntry>,
}

/// Object model held entirely in memory
///
/// Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct InMemoryObjectModel {
    objects: RwLock<BTreeMap<ObjectRef, ObjectEntry>>,
}

impl InMemoryObjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object graph: `{"objects": [{"id": 1, "group": ..., "properties": [...]}]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ModelDocument = serde_json::from_str(json)?;
        let model = Self::new();
        {
            let mut objects = model.objects.write();
            for entry in doc.objects {
                objects.insert(entry.info.id, entry);
            }
        }
        Ok(model)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        let doc = ModelDocument {
            objects: self.objects.read().values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Add (or replace) an object
    pub fn add_object(&self, info: ObjectInfo, properties: Vec<PropertyState>) -> ObjectRef {
        let id = info.id;
        self.objects
            .write()
            .insert(id, ObjectEntry { info, properties });
        id
    }

    pub fn remove_object(&self, object: ObjectRef) -> Result<()> {
        self.objects
            .write()
            .remove(&object)
            .map(|_| ())
            .ok_or(TraceError::ObjectNotFound {
                object_id: object.0,
            })
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Change a property programmatically (not attributed to the user)
    pub fn set_property(
        &self,
        object: ObjectRef,
        property: &str,
        value: Vec<TraceValue>,
    ) -> Result<()> {
        self.update(object, property, |p| p.value = value)
    }

    /// Change a property through the user pathway
    pub fn set_property_by_user(
        &self,
        object: ObjectRef,
        property: &str,
        value: Vec<TraceValue>,
    ) -> Result<()> {
        self.update(object, property, |p| {
            p.value = value;
            p.user_modified = true;
        })
    }

    /// Restore a property's default and clear its user flag
    pub fn reset_property(&self, object: ObjectRef, property: &str) -> Result<()> {
        self.update(object, property, |p| {
            p.value = p.default.clone();
            p.user_modified = false;
        })
    }

    fn update(
        &self,
        object: ObjectRef,
        property: &str,
        apply: impl FnOnce(&mut PropertyState),
    ) -> Result<()> {
        let mut objects = self.objects.write();
        let entry = objects.get_mut(&object).ok_or(TraceError::ObjectNotFound {
            object_id: object.0,
        })?;
        match entry.properties.iter_mut().find(|p| p.name == property) {
            Some(state) => {
                apply(state);
                Ok(())
            }
            None => Err(TraceError::InvalidConfig {
                reason: format!("object {} has no property '{}'", object, property),
            }),
        }
    }

    fn with_property<T>(
        &self,
        object: ObjectRef,
        property: &str,
        read: impl FnOnce(&PropertyState) -> T,
    ) -> Option<T> {
        let objects = self.objects.read();
        objects
            .get(&object)
            .and_then(|e| e.properties.iter().find(|p| p.name == property))
            .map(read)
    }
}

impl ObjectModel for InMemoryObjectModel {
    fn objects(&self) -> Vec<ObjectRef> {
        self.objects.read().keys().copied().collect()
    }

    fn info(&self, object: ObjectRef) -> Option<ObjectInfo> {
        self.objects.read().get(&object).map(|e| e.info.clone())
    }

    fn properties(&self, object: ObjectRef) -> Vec<String> {
        self.objects
            .read()
            .get(&object)
            .map(|e| e.properties.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default()
    }

    fn value(&self, object: ObjectRef, property: &str) -> Option<Vec<TraceValue>> {
        self.with_property(object, property, |p| p.value.clone())
    }

    fn is_at_default(&self, object: ObjectRef, property: &str) -> bool {
        self.with_property(object, property, |p| same_values(&p.value, &p.default))
            .unwrap_or(true)
    }

    fn is_user_modified(&self, object: ObjectRef, property: &str) -> bool {
        self.with_property(object, property, |p| p.user_modified)
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere_model() -> (InMemoryObjectModel, ObjectRef) {
        let model = InMemoryObjectModel::new();
        let sphere = model.add_object(
            ObjectInfo::source(ObjectRef(1), "Sphere", "Sphere1"),
            vec![
                PropertyState::new("Radius", 0.5),
                PropertyState::vector("Center", vec![0.0.into(), 0.0.into(), 0.0.into()]),
            ],
        );
        (model, sphere)
    }

    #[test]
    fn test_programmatic_change_is_not_user_modified() {
        let (model, sphere) = sphere_model();
        model.set_property(sphere, "Radius", vec![2.0.into()]).unwrap();

        assert!(!model.is_at_default(sphere, "Radius"));
        assert!(!model.is_user_modified(sphere, "Radius"));
    }

    #[test]
    fn test_nan_default_is_at_default() {
        let model = InMemoryObjectModel::new();
        let threshold = model.add_object(
            ObjectInfo::source(ObjectRef(1), "Threshold", "Threshold1"),
            vec![PropertyState::new("LowerThreshold", f64::NAN)],
        );
        assert!(model.is_at_default(threshold, "LowerThreshold"));

        model.set_property(threshold, "LowerThreshold", vec![0.5.into()]).unwrap();
        assert!(!model.is_at_default(threshold, "LowerThreshold"));
    }

    #[test]
    fn test_user_change_and_reset() {
        let (model, sphere) = sphere_model();
        model
            .set_property_by_user(sphere, "Radius", vec![2.0.into()])
            .unwrap();
        assert!(model.is_user_modified(sphere, "Radius"));

        model.reset_property(sphere, "Radius").unwrap();
        assert!(model.is_at_default(sphere, "Radius"));
        assert!(!model.is_user_modified(sphere, "Radius"));
    }

    #[test]
    fn test_unknown_object_and_property() {
        let (model, sphere) = sphere_model();
        let err = model
            .set_property(ObjectRef(99), "Radius", vec![1.0.into()])
            .unwrap_err();
        assert_eq!(err.error_code(), "OBJECT_NOT_FOUND");

        let err = model
            .set_property(sphere, "Nope", vec![1.0.into()])
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_property_order_is_declaration_order() {
        let (model, sphere) = sphere_model();
        assert_eq!(model.properties(sphere), vec!["Radius", "Center"]);
    }

    #[test]
    fn test_kind_helpers() {
        let model = InMemoryObjectModel::new();
        let lut = model.add_object(
            ObjectInfo::supplemental(ObjectRef(5), "lookup_tables", "PVLookupTable", "RTData"),
            vec![],
        );
        let rep = model.add_object(
            ObjectInfo::representation(ObjectRef(6), ObjectRef(1), ObjectRef(2), "Rep1")
                .hidden(true),
            vec![],
        );
        assert!(model.is_supplemental(lut));
        assert!(!model.is_supplemental(rep));
        assert!(model.is_hidden_representation(rep));
        assert!(!model.is_hidden_representation(lut));
    }

    #[test]
    fn test_json_round_trip() {
        let (model, sphere) = sphere_model();
        model
            .set_property_by_user(sphere, "Radius", vec![3.0.into()])
            .unwrap();

        let json = model.to_json().unwrap();
        let loaded = InMemoryObjectModel::from_json(&json).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.value(sphere, "Radius"), Some(vec![TraceValue::Real(3.0)]));
        assert!(loaded.is_user_modified(sphere, "Radius"));
        assert_eq!(loaded.info(sphere).unwrap().label, "Sphere1");
    }

    #[test]
    fn test_from_json_document() {
        let json = r#"{
            "objects": [
                {"id": 1, "group": "views", "xml_name": "RenderView", "label": "RenderView1",
                 "kind": "view", "properties": []},
                {"id": 2, "group": "sources", "xml_name": "Cone", "label": "Cone1", "kind": "source",
                 "properties": [{"name": "Resolution", "value": [12], "default": [6]}]}
            ]
        }"#;
        let model = InMemoryObjectModel::from_json(json).unwrap();
        assert_eq!(model.objects(), vec![ObjectRef(1), ObjectRef(2)]);
        assert!(!model.is_at_default(ObjectRef(2), "Resolution"));
        assert_eq!(model.info(ObjectRef(1)).unwrap().kind, ObjectKind::View);
    }
}
