//! Trace engine
//!
//! Turns trace events into Python statements and accumulates them. The engine
//! remembers which objects already have a variable in the script and what
//! their properties looked like when last written, so later events only
//! emit what changed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::args::{same_values, ArgumentSet, TraceValue};
use crate::error::{Result, TraceError};
use crate::model::{ObjectInfo, ObjectKind, ObjectModel, ObjectRef};
use crate::policy::{PropertiesToTrace, TracePolicy};
use crate::script::{self, NameRegistry, TraceScript, TRACE_PREAMBLE};
use crate::sink::DiagnosticSink;

use super::event::{TraceEvent, TraceItemKind};

type Snapshot = HashMap<String, Vec<TraceValue>>;

/// Records trace events into a script
pub struct TraceEngine {
    id: Uuid,
    policy: TracePolicy,
    model: Arc<dyn ObjectModel>,
    sink: Arc<dyn DiagnosticSink>,
    script: TraceScript,
    names: NameRegistry,
    /// Property values as of the last time each object was written
    snapshots: HashMap<ObjectRef, Snapshot>,
    /// Set once rendering fails; recording stops for the rest of the session
    error: Option<String>,
    events_recorded: u64,
}

impl fmt::Debug for TraceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceEngine")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("model", &self.model.name())
            .field("sink", &self.sink.name())
            .field("statements", &self.script.len())
            .field("error", &self.error)
            .finish()
    }
}

impl TraceEngine {
    pub fn new(
        model: Arc<dyn ObjectModel>,
        sink: Arc<dyn DiagnosticSink>,
        policy: TracePolicy,
    ) -> Self {
        Self::with_preamble(model, sink, policy, TRACE_PREAMBLE)
    }

    pub(crate) fn with_preamble(
        model: Arc<dyn ObjectModel>,
        sink: Arc<dyn DiagnosticSink>,
        policy: TracePolicy,
        preamble: &'static str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy,
            model,
            sink,
            script: TraceScript::new(preamble),
            names: NameRegistry::new(),
            snapshots: HashMap::new(),
            error: None,
            events_recorded: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn policy(&self) -> TracePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: TracePolicy) {
        self.policy = policy;
    }

    pub fn trace_xml_defaults(&self) -> bool {
        self.policy.trace_xml_defaults
    }

    pub fn set_trace_xml_defaults(&mut self, value: bool) {
        self.policy.trace_xml_defaults = value;
    }

    pub fn log_to_stdout(&self) -> bool {
        self.policy.log_to_stdout
    }

    pub fn set_log_to_stdout(&mut self, value: bool) {
        self.policy.log_to_stdout = value;
    }

    pub fn properties_to_trace_on_create(&self) -> PropertiesToTrace {
        self.policy.properties_to_trace_on_create
    }

    pub fn set_properties_to_trace_on_create(&mut self, value: PropertiesToTrace) {
        self.policy.properties_to_trace_on_create = value;
    }

    pub fn fully_trace_supplemental_proxies(&self) -> bool {
        self.policy.fully_trace_supplemental_proxies
    }

    pub fn set_fully_trace_supplemental_proxies(&mut self, value: bool) {
        self.policy.fully_trace_supplemental_proxies = value;
    }

    /// Surface a rendering failure from earlier in the session
    pub fn check_for_error(&self) -> Result<()> {
        match &self.error {
            Some(reason) => Err(TraceError::Render {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Number of events successfully rendered
    pub fn events_recorded(&self) -> u64 {
        self.events_recorded
    }

    pub fn statements(&self) -> &[String] {
        self.script.statements()
    }

    /// Snapshot of the script so far
    pub fn current_trace(&self) -> Result<String> {
        self.check_for_error()?;
        Ok(self.script.render())
    }

    /// Render one event and append it to the script
    ///
    /// Failures never propagate: they put the engine into the error state and
    /// are reported by [`TraceEngine::check_for_error`].
    pub fn record(&mut self, event: &TraceEvent) {
        if self.error.is_some() {
            debug!(tracer = %self.id, item = %event.item_type, "tracer in error state, item ignored");
            return;
        }

        let mut out = Vec::new();
        match self.render_event(event, &mut out) {
            Ok(()) => {
                debug!(
                    tracer = %self.id,
                    item = %event.item_type,
                    statements = out.len(),
                    "recorded trace item"
                );
                if self.policy.log_to_stdout {
                    for statement in &out {
                        self.sink.emit(statement);
                    }
                }
                self.script.append(out);
                self.events_recorded += 1;
            }
            Err(err) => {
                warn!(
                    tracer = %self.id,
                    item = %event.item_type,
                    error = %err,
                    "trace item failed to render, tracing disabled for this session"
                );
                self.error = Some(err.to_string());
            }
        }
    }

    fn render_event(&mut self, event: &TraceEvent, out: &mut Vec<String>) -> Result<()> {
        let kind: TraceItemKind = event.item_type.parse()?;
        let args = &event.args;
        match kind {
            TraceItemKind::RegisterPipelineProxy => self.register_pipeline_proxy(args, out),
            TraceItemKind::RegisterViewProxy => self.register_view_proxy(args, out),
            TraceItemKind::Show => self.show(args, out),
            TraceItemKind::Hide => self.hide(args, out),
            TraceItemKind::Delete => self.delete(args, out),
            TraceItemKind::SetActiveSource => {
                let source = object_arg(kind, args, "source")?;
                let var = self.reference(source, out)?;
                out.push(format!("SetActiveSource({})", var));
                Ok(())
            }
            TraceItemKind::SetActiveView => {
                let view = object_arg(kind, args, "view")?;
                let var = self.reference(view, out)?;
                out.push(format!("SetActiveView({})", var));
                Ok(())
            }
            TraceItemKind::PropertiesModified => self.properties_modified(args, out),
            TraceItemKind::CallMethod => self.call_method(args, out),
            TraceItemKind::CallFunction => self.call_function(args, out),
            TraceItemKind::TraceText => {
                let positional = args.positional();
                let text = positional
                    .first()
                    .and_then(|v| v.as_text())
                    .or_else(|| args.named("text").and_then(TraceValue::as_text))
                    .ok_or_else(|| missing(kind, "text"))?;
                out.push(text.to_string());
                Ok(())
            }
        }
    }

    fn register_pipeline_proxy(&mut self, args: &ArgumentSet, out: &mut Vec<String>) -> Result<()> {
        let proxy = object_arg(TraceItemKind::RegisterPipelineProxy, args, "proxy")?;
        let info = self.info(proxy)?;

        let mut ctor_args = vec![format!("registrationName={}", script::quote(&info.label))];
        if let Some(input) = self.model.value(proxy, "Input").filter(|v| !v.is_empty()) {
            let literal = self.property_literal(&input, out)?;
            ctor_args.push(format!("Input={}", literal));
        }

        let var = self.variable_for(proxy, &info, None);
        out.push(format!("# create a new '{}'", info.xml_name));
        out.push(format!("{} = {}({})", var, info.xml_name, ctor_args.join(", ")));
        self.dump_properties(proxy, &var, self.policy.creation_filter(), &["Input"], out)
    }

    fn register_view_proxy(&mut self, args: &ArgumentSet, out: &mut Vec<String>) -> Result<()> {
        let proxy = object_arg(TraceItemKind::RegisterViewProxy, args, "proxy")?;
        let info = self.info(proxy)?;

        let var = self.variable_for(proxy, &info, None);
        out.push(format!("# create a new '{}'", info.xml_name));
        out.push(format!("{} = CreateView({})", var, script::quote(&info.xml_name)));
        self.dump_properties(proxy, &var, self.policy.creation_filter(), &[], out)
    }

    fn show(&mut self, args: &ArgumentSet, out: &mut Vec<String>) -> Result<()> {
        let kind = TraceItemKind::Show;
        let producer = object_arg(kind, args, "producer")?;
        let view = optional_object_arg(kind, args, "view")?;
        let display = optional_object_arg(kind, args, "display")?;

        let producer_var = self.reference(producer, out)?;
        let call = match view {
            Some(view) => format!("Show({}, {})", producer_var, self.reference(view, out)?),
            None => format!("Show({})", producer_var),
        };

        out.push("# show data in view".to_string());
        match display {
            // already in the script: it keeps its variable and was dumped on creation
            Some(display) if self.names.contains(display) => {
                out.push(call);
                Ok(())
            }
            Some(display) => {
                let info = self.info(display)?;
                let var = self.variable_for(display, &info, Some(&producer_var));
                out.push(format!("{} = {}", var, call));
                self.dump_properties(display, &var, self.policy.creation_filter(), &[], out)
            }
            None => {
                out.push(call);
                Ok(())
            }
        }
    }

    fn hide(&mut self, args: &ArgumentSet, out: &mut Vec<String>) -> Result<()> {
        let kind = TraceItemKind::Hide;
        let producer = object_arg(kind, args, "producer")?;
        let view = optional_object_arg(kind, args, "view")?;

        let producer_var = self.reference(producer, out)?;
        let call = match view {
            Some(view) => format!("Hide({}, {})", producer_var, self.reference(view, out)?),
            None => format!("Hide({})", producer_var),
        };
        out.push("# hide data in view".to_string());
        out.push(call);
        Ok(())
    }

    fn delete(&mut self, args: &ArgumentSet, out: &mut Vec<String>) -> Result<()> {
        let proxy = object_arg(TraceItemKind::Delete, args, "proxy")?;
        let var = match self.names.get(proxy) {
            Some(var) => var.to_string(),
            // never traced: look it up while the model still has it
            None => self.introduce(proxy, out)?,
        };
        out.push(format!("# destroy {}", var));
        out.push(format!("Delete({})", var));
        out.push(format!("del {}", var));
        self.names.release(proxy);
        self.snapshots.remove(&proxy);
        Ok(())
    }

    fn properties_modified(&mut self, args: &ArgumentSet, out: &mut Vec<String>) -> Result<()> {
        let kind = TraceItemKind::PropertiesModified;
        let proxy = object_arg(kind, args, "proxy")?;
        let comment = match args.named("comment") {
            Some(value) => Some(
                value
                    .as_text()
                    .ok_or_else(|| wrong_type(kind, "comment", "text", value))?
                    .to_string(),
            ),
            None => None,
        };

        let var = self.reference(proxy, out)?;
        let model = Arc::clone(&self.model);
        let changed: Vec<String> = {
            let snapshot = self.snapshots.get(&proxy);
            model
                .properties(proxy)
                .into_iter()
                .filter(|p| match snapshot {
                    Some(snap) => match (model.value(proxy, p), snap.get(p)) {
                        (Some(now), Some(then)) => !same_values(&now, then),
                        (None, None) => false,
                        _ => true,
                    },
                    None => !model.is_at_default(proxy, p),
                })
                .collect()
        };
        if changed.is_empty() {
            return Ok(());
        }

        let mut assignments = Vec::with_capacity(changed.len());
        for property in &changed {
            let value = model.value(proxy, property).unwrap_or_default();
            let literal = self.property_literal(&value, out)?;
            assignments.push(format!("{}.{} = {}", var, property, literal));
        }
        out.push(format!(
            "# {}",
            comment.unwrap_or_else(|| format!("Properties modified on {}", var))
        ));
        out.extend(assignments);
        self.take_snapshot(proxy);
        Ok(())
    }

    fn call_method(&mut self, args: &ArgumentSet, out: &mut Vec<String>) -> Result<()> {
        let kind = TraceItemKind::CallMethod;
        let positional = args.positional();
        let target = positional
            .first()
            .ok_or_else(|| missing(kind, "object"))?;
        let target = target
            .as_object()
            .ok_or_else(|| wrong_type(kind, "object", "object", target))?;
        let method = positional
            .get(1)
            .and_then(|v| v.as_text())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| missing(kind, "method name"))?;
        if !script::is_identifier(method) {
            return Err(invalid_name(kind, "method name", method));
        }

        let var = self.reference(target, out)?;
        let call_args = self.call_arguments(kind, &positional[2..], args, out)?;
        out.push(format!("{}.{}({})", var, method, call_args));
        Ok(())
    }

    fn call_function(&mut self, args: &ArgumentSet, out: &mut Vec<String>) -> Result<()> {
        let kind = TraceItemKind::CallFunction;
        let positional = args.positional();
        let function = positional
            .first()
            .and_then(|v| v.as_text())
            .filter(|f| !f.is_empty())
            .ok_or_else(|| missing(kind, "function name"))?;
        if !function.split('.').all(script::is_identifier) {
            return Err(invalid_name(kind, "function name", function));
        }

        let call_args = self.call_arguments(kind, &positional[1..], args, out)?;
        out.push(format!("{}({})", function, call_args));
        Ok(())
    }

    fn call_arguments(
        &mut self,
        kind: TraceItemKind,
        positional: &[&TraceValue],
        args: &ArgumentSet,
        out: &mut Vec<String>,
    ) -> Result<String> {
        let mut rendered = Vec::new();
        for value in positional {
            rendered.push(self.literal(value, out)?);
        }
        for (key, value) in args.named_args() {
            if !script::is_identifier(key) {
                return Err(invalid_name(kind, "keyword", key));
            }
            rendered.push(format!("{}={}", key, self.literal(value, out)?));
        }
        Ok(rendered.join(", "))
    }

    fn info(&self, object: ObjectRef) -> Result<ObjectInfo> {
        self.model.info(object).ok_or(TraceError::ObjectNotFound {
            object_id: object.0,
        })
    }

    fn variable_for(&mut self, object: ObjectRef, info: &ObjectInfo, input: Option<&str>) -> String {
        match self.names.get(object) {
            Some(existing) => existing.to_string(),
            None => self
                .names
                .assign(object, &script::base_name(info, input)),
        }
    }

    /// Variable holding `object`, introducing it on first encounter
    fn reference(&mut self, object: ObjectRef, out: &mut Vec<String>) -> Result<String> {
        match self.names.get(object) {
            Some(var) => Ok(var.to_string()),
            None => self.introduce(object, out),
        }
    }

    /// Emit an accessor for an object the script has not seen yet
    fn introduce(&mut self, object: ObjectRef, out: &mut Vec<String>) -> Result<String> {
        let info = self.info(object)?;
        let label = script::quote(&info.label);
        match info.kind {
            ObjectKind::Source => {
                let var = self.variable_for(object, &info, None);
                out.push(format!("{} = FindSource({})", var, label));
                Ok(var)
            }
            ObjectKind::View => {
                let var = self.variable_for(object, &info, None);
                out.push(format!(
                    "{} = FindViewOrCreate({}, viewtype={})",
                    var,
                    label,
                    script::quote(&info.xml_name)
                ));
                Ok(var)
            }
            ObjectKind::Representation => {
                let (Some(input), Some(view)) = (info.input, info.view) else {
                    return Err(TraceError::render(format!(
                        "representation {} has no input or view",
                        object
                    )));
                };
                let input_var = self.reference(input, out)?;
                let view_var = self.reference(view, out)?;
                let var = self.variable_for(object, &info, Some(&input_var));
                out.push(format!(
                    "{} = GetDisplayProperties({}, view={})",
                    var, input_var, view_var
                ));
                Ok(var)
            }
            ObjectKind::Supplemental => {
                let var = self.variable_for(object, &info, None);
                let accessor = match info.group.as_str() {
                    "lookup_tables" => format!("GetColorTransferFunction({})", label),
                    "piecewise_functions" => format!("GetOpacityTransferFunction({})", label),
                    group => format!(
                        "servermanager.ProxyManager().GetProxy({}, {})",
                        script::quote(group),
                        label
                    ),
                };
                out.push(format!("{} = {}", var, accessor));
                if self.policy.fully_trace_supplemental_proxies {
                    self.dump_properties(object, &var, self.policy.creation_filter(), &[], out)?;
                }
                Ok(var)
            }
        }
    }

    fn literal(&mut self, value: &TraceValue, out: &mut Vec<String>) -> Result<String> {
        match value.as_object() {
            Some(object) => self.reference(object, out),
            None => Ok(script::scalar_literal(value).unwrap_or_default()),
        }
    }

    fn property_literal(&mut self, values: &[TraceValue], out: &mut Vec<String>) -> Result<String> {
        let mut elements = Vec::with_capacity(values.len());
        for value in values {
            elements.push(self.literal(value, out)?);
        }
        Ok(script::join_elements(elements))
    }

    /// Properties of `object` selected by `filter`, in declaration order
    fn selected_properties(&self, object: ObjectRef, filter: PropertiesToTrace) -> Vec<String> {
        self.model
            .properties(object)
            .into_iter()
            .filter(|p| match filter {
                PropertiesToTrace::All => true,
                PropertiesToTrace::Modified => !self.model.is_at_default(object, p),
                PropertiesToTrace::UserModified => self.model.is_user_modified(object, p),
            })
            .collect()
    }

    fn dump_properties(
        &mut self,
        object: ObjectRef,
        var: &str,
        filter: PropertiesToTrace,
        skip: &[&str],
        out: &mut Vec<String>,
    ) -> Result<()> {
        // snapshot first so a reference cycle back to this object stops here
        self.take_snapshot(object);
        for property in self.selected_properties(object, filter) {
            if skip.contains(&property.as_str()) {
                continue;
            }
            let value = self.model.value(object, &property).unwrap_or_default();
            let literal = self.property_literal(&value, out)?;
            out.push(format!("{}.{} = {}", var, property, literal));
        }
        Ok(())
    }

    fn take_snapshot(&mut self, object: ObjectRef) {
        let snapshot: Snapshot = self
            .model
            .properties(object)
            .into_iter()
            .filter_map(|p| self.model.value(object, &p).map(|v| (p, v)))
            .collect();
        self.snapshots.insert(object, snapshot);
    }
}

fn missing(kind: TraceItemKind, what: &str) -> TraceError {
    TraceError::render(format!("'{}' requires argument '{}'", kind, what))
}

fn wrong_type(kind: TraceItemKind, key: &str, expected: &str, got: &TraceValue) -> TraceError {
    TraceError::render(format!(
        "'{}' argument '{}' must be {}, got {}",
        kind,
        key,
        expected,
        got.kind()
    ))
}

fn invalid_name(kind: TraceItemKind, what: &str, name: &str) -> TraceError {
    TraceError::render(format!(
        "'{}' {} '{}' is not a valid Python identifier",
        kind, what, name
    ))
}

fn object_arg(kind: TraceItemKind, args: &ArgumentSet, key: &str) -> Result<ObjectRef> {
    optional_object_arg(kind, args, key)?.ok_or_else(|| missing(kind, key))
}

fn optional_object_arg(
    kind: TraceItemKind,
    args: &ArgumentSet,
    key: &str,
) -> Result<Option<ObjectRef>> {
    match args.named(key) {
        Some(value) => value
            .as_object()
            .map(Some)
            .ok_or_else(|| wrong_type(kind, key, "an object", value)),
        None => Ok(None),
    }
}
