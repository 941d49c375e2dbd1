//! One-shot state dump
//!
//! Walks every live object in the model and writes a script that rebuilds the
//! current configuration: views first, then pipeline sources with inputs
//! before consumers, then their representations. Supplemental objects (lookup
//! tables and friends) are written in full the first time they are
//! referenced.
//!
//! The dump runs its own private engine, so it never mixes with, or depends
//! on, an incremental trace.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::args::TraceItemArgs;
use crate::error::{Result, TraceError};
use crate::model::{ObjectKind, ObjectModel, ObjectRef};
use crate::policy::{PropertiesToTrace, TracePolicy};
use crate::script::STATE_PREAMBLE;
use crate::sink::DiagnosticSink;
use crate::trace::{TraceContext, TraceEngine, TraceEvent, TraceItemKind};

/// Save the state of the application as a script
///
/// Fails with [`TraceError::ConcurrentTracing`] while `context` is tracing.
pub fn get_state(
    context: &TraceContext,
    properties_to_trace_on_create: PropertiesToTrace,
    skip_hidden_representations: bool,
) -> Result<String> {
    context.get_state(properties_to_trace_on_create, skip_hidden_representations)
}

/// Builder for a state dump over an object model
pub struct StateDump {
    model: Arc<dyn ObjectModel>,
    sink: Arc<dyn DiagnosticSink>,
    properties_to_trace_on_create: PropertiesToTrace,
    skip_hidden_representations: bool,
}

impl StateDump {
    pub fn new(model: Arc<dyn ObjectModel>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            model,
            sink,
            properties_to_trace_on_create: PropertiesToTrace::Modified,
            skip_hidden_representations: true,
        }
    }

    pub fn properties_to_trace_on_create(mut self, value: PropertiesToTrace) -> Self {
        self.properties_to_trace_on_create = value;
        self
    }

    pub fn skip_hidden_representations(mut self, value: bool) -> Self {
        self.skip_hidden_representations = value;
        self
    }

    /// Produce the script
    pub fn render(self) -> Result<String> {
        let policy = TracePolicy {
            properties_to_trace_on_create: self.properties_to_trace_on_create,
            fully_trace_supplemental_proxies: true,
            ..Default::default()
        };
        let mut engine = TraceEngine::with_preamble(
            Arc::clone(&self.model),
            Arc::clone(&self.sink),
            policy,
            STATE_PREAMBLE,
        );

        let mut views = Vec::new();
        let mut sources = Vec::new();
        let mut representations = Vec::new();
        for object in self.model.objects() {
            let info = self
                .model
                .info(object)
                .ok_or(TraceError::ObjectNotFound { object_id: object.0 })?;
            match info.kind {
                ObjectKind::View => views.push(object),
                ObjectKind::Source => sources.push(object),
                ObjectKind::Representation => representations.push(object),
                ObjectKind::Supplemental => {}
            }
        }
        views.sort();
        representations.sort();

        for view in &views {
            engine.record(&TraceEvent::new(
                TraceItemKind::RegisterViewProxy.as_str(),
                TraceItemArgs::new().kwarg("proxy", *view),
            ));
        }

        for source in self.pipeline_order(&sources)? {
            engine.record(&TraceEvent::new(
                TraceItemKind::RegisterPipelineProxy.as_str(),
                TraceItemArgs::new().kwarg("proxy", source),
            ));
        }

        let mut skipped = 0usize;
        for representation in representations {
            let hidden = self.model.is_hidden_representation(representation);
            if hidden && self.skip_hidden_representations {
                skipped += 1;
                continue;
            }
            let Some(info) = self.model.info(representation) else {
                continue;
            };
            let (Some(input), Some(view)) = (info.input, info.view) else {
                return Err(TraceError::render(format!(
                    "representation {} has no input or view",
                    representation
                )));
            };
            engine.record(&TraceEvent::new(
                TraceItemKind::Show.as_str(),
                TraceItemArgs::new()
                    .kwarg("producer", input)
                    .kwarg("view", view)
                    .kwarg("display", representation),
            ));
            if hidden {
                engine.record(&TraceEvent::new(
                    TraceItemKind::Hide.as_str(),
                    TraceItemArgs::new()
                        .kwarg("producer", input)
                        .kwarg("view", view),
                ));
            }
        }

        debug!(
            views = views.len(),
            sources = sources.len(),
            skipped_hidden = skipped,
            policy = %self.properties_to_trace_on_create,
            "state dump rendered"
        );
        engine.current_trace()
    }

    /// Sources ordered so that every input precedes its consumers
    ///
    /// Ties are broken by object id. A cycle is a render error.
    fn pipeline_order(&self, sources: &[ObjectRef]) -> Result<Vec<ObjectRef>> {
        let known: BTreeSet<ObjectRef> = sources.iter().copied().collect();
        let mut pending: BTreeMap<ObjectRef, BTreeSet<ObjectRef>> = BTreeMap::new();
        for &source in sources {
            let inputs: BTreeSet<ObjectRef> = self
                .model
                .properties(source)
                .iter()
                .filter_map(|p| self.model.value(source, p))
                .flatten()
                .filter_map(|v| v.as_object())
                .filter(|o| *o != source && known.contains(o))
                .collect();
            pending.insert(source, inputs);
        }

        let mut ordered = Vec::with_capacity(sources.len());
        while !pending.is_empty() {
            let ready: Vec<ObjectRef> = pending
                .iter()
                .filter(|(_, inputs)| inputs.is_empty())
                .map(|(source, _)| *source)
                .collect();
            if ready.is_empty() {
                let stuck: Vec<String> = pending.keys().map(ToString::to_string).collect();
                return Err(TraceError::render(format!(
                    "pipeline has a dependency cycle among {}",
                    stuck.join(", ")
                )));
            }
            // one at a time keeps the id tie-break stable across levels
            let next = ready[0];
            pending.remove(&next);
            for inputs in pending.values_mut() {
                inputs.remove(&next);
            }
            ordered.push(next);
        }
        Ok(ordered)
    }
}
