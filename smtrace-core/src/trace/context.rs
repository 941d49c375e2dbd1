//! The active-tracer slot
//!
//! A [`TraceContext`] is the explicit stand-in for a process-wide "active
//! tracer". It is created once by the application and passed (by reference or
//! `Arc`) to every call site that records trace items. It holds at most one
//! live [`TraceEngine`] at a time.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::config::TraceConfig;
use crate::error::{Result, TraceError};
use crate::model::ObjectModel;
use crate::policy::{PropertiesToTrace, TracePolicy};
use crate::sink::{DiagnosticSink, StdoutSink};
use crate::state::StateDump;

use super::engine::TraceEngine;
use super::event::TraceEvent;

/// Shared handle to a running tracer
///
/// Two handles are equal when they refer to the same engine.
#[derive(Clone)]
pub struct TracerHandle {
    engine: Arc<Mutex<TraceEngine>>,
}

impl TracerHandle {
    fn new(engine: TraceEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Lock the engine
    ///
    /// The lock is held for the whole evaluate/render/append/log sequence of
    /// a record, which keeps events in arrival order across threads.
    pub fn lock(&self) -> MutexGuard<'_, TraceEngine> {
        self.engine.lock()
    }

    pub fn id(&self) -> Uuid {
        self.lock().id()
    }

    pub fn record(&self, event: &TraceEvent) {
        self.lock().record(event);
    }

    pub fn current_trace(&self) -> Result<String> {
        self.lock().current_trace()
    }

    pub fn check_for_error(&self) -> Result<()> {
        self.lock().check_for_error()
    }

    pub fn policy(&self) -> TracePolicy {
        self.lock().policy()
    }

    pub fn set_policy(&self, policy: TracePolicy) {
        self.lock().set_policy(policy);
    }

    pub fn trace_xml_defaults(&self) -> bool {
        self.lock().trace_xml_defaults()
    }

    pub fn set_trace_xml_defaults(&self, value: bool) {
        self.lock().set_trace_xml_defaults(value);
    }

    pub fn log_to_stdout(&self) -> bool {
        self.lock().log_to_stdout()
    }

    pub fn set_log_to_stdout(&self, value: bool) {
        self.lock().set_log_to_stdout(value);
    }

    pub fn properties_to_trace_on_create(&self) -> PropertiesToTrace {
        self.lock().properties_to_trace_on_create()
    }

    pub fn set_properties_to_trace_on_create(&self, value: PropertiesToTrace) {
        self.lock().set_properties_to_trace_on_create(value);
    }

    pub fn fully_trace_supplemental_proxies(&self) -> bool {
        self.lock().fully_trace_supplemental_proxies()
    }

    pub fn set_fully_trace_supplemental_proxies(&self, value: bool) {
        self.lock().set_fully_trace_supplemental_proxies(value);
    }
}

impl PartialEq for TracerHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine)
    }
}

impl Eq for TracerHandle {}

impl fmt::Debug for TracerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.engine.try_lock() {
            Some(engine) => f.debug_tuple("TracerHandle").field(&*engine).finish(),
            None => f.write_str("TracerHandle(<locked>)"),
        }
    }
}

/// Holder of the (at most one) active tracer
pub struct TraceContext {
    model: Arc<dyn ObjectModel>,
    sink: Arc<dyn DiagnosticSink>,
    config: TraceConfig,
    active: Mutex<Option<TracerHandle>>,
}

impl fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceContext")
            .field("model", &self.model.name())
            .field("sink", &self.sink.name())
            .field("config", &self.config)
            .field("active", &self.active.lock().is_some())
            .finish()
    }
}

impl TraceContext {
    /// Create a context over an object model, echoing to stdout
    pub fn new(model: Arc<dyn ObjectModel>) -> Self {
        Self {
            model,
            sink: Arc::new(StdoutSink),
            config: TraceConfig::default(),
            active: Mutex::new(None),
        }
    }

    /// Use a different sink for `log_to_stdout` output
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use `config.policy` for every tracer started from now on
    pub fn with_config(mut self, config: TraceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn model(&self) -> &Arc<dyn ObjectModel> {
        &self.model
    }

    /// Start tracing, or return the tracer that is already running
    pub fn start_trace(&self) -> TracerHandle {
        let mut active = self.active.lock();
        if let Some(existing) = active.as_ref() {
            debug!(tracer = %existing.id(), "trace already active");
            return existing.clone();
        }

        let engine = TraceEngine::new(
            Arc::clone(&self.model),
            Arc::clone(&self.sink),
            self.config.policy,
        );
        debug!(tracer = %engine.id(), policy = ?engine.policy(), "trace started");
        let handle = TracerHandle::new(engine);
        *active = Some(handle.clone());
        handle
    }

    /// Stop tracing and return the generated script
    ///
    /// The tracer is uninstalled even when it ended in an error state; the
    /// error is returned instead of the partial script.
    pub fn stop_trace(&self) -> Result<String> {
        let handle = self.active.lock().take().ok_or(TraceError::NoActiveTracer)?;
        let engine = handle.lock();
        debug!(
            tracer = %engine.id(),
            events = engine.events_recorded(),
            errored = engine.has_error(),
            "trace stopped"
        );
        engine.current_trace()
    }

    /// Script recorded so far, without stopping
    pub fn current_trace(&self) -> Result<String> {
        self.active_tracer()
            .ok_or(TraceError::NoActiveTracer)?
            .current_trace()
    }

    pub fn active_tracer(&self) -> Option<TracerHandle> {
        self.active.lock().clone()
    }

    pub fn is_tracing(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Record an event on the active tracer; no-op when tracing is off
    pub fn record(&self, event: &TraceEvent) {
        if let Some(handle) = self.active_tracer() {
            handle.record(event);
        }
    }

    /// Serialize the whole object graph into a state script
    ///
    /// Not allowed while a trace is running. The slot stays locked for the
    /// duration, so no trace can start halfway through the dump.
    pub fn get_state(
        &self,
        properties_to_trace_on_create: PropertiesToTrace,
        skip_hidden_representations: bool,
    ) -> Result<String> {
        let active = self.active.lock();
        if active.is_some() {
            return Err(TraceError::ConcurrentTracing);
        }
        StateDump::new(Arc::clone(&self.model), Arc::clone(&self.sink))
            .properties_to_trace_on_create(properties_to_trace_on_create)
            .skip_hidden_representations(skip_hidden_representations)
            .render()
    }
}
