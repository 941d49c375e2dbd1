//! # smtrace - trace recording for visualization sessions
//!
//! smtrace records what a user does in a visualization application and turns
//! it into a Python script that replays those actions:
//!
//! - **Trace items**: call sites report events (an object was created, a
//!   property changed, a method was called) with keyword and positional
//!   arguments
//! - **Tracer**: at most one per [`TraceContext`]; renders events into script
//!   statements according to a [`TracePolicy`]
//! - **State dump**: writes the entire current object graph as a script,
//!   without incremental recording
//!
//! The application's objects are reached through the [`ObjectModel`] trait.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use smtrace_core::{
//!     InMemoryObjectModel, ObjectInfo, ObjectRef, PropertyState, TraceContext, TraceItem,
//!     TraceItemArgs,
//! };
//!
//! let model = Arc::new(InMemoryObjectModel::new());
//! let sphere = model.add_object(
//!     ObjectInfo::source(ObjectRef(1), "Sphere", "Sphere1"),
//!     vec![PropertyState::new("Radius", 0.5)],
//! );
//! model.set_property_by_user(sphere, "Radius", vec![2.0.into()]).unwrap();
//!
//! let ctx = TraceContext::new(model);
//! ctx.start_trace();
//! TraceItem::record(&ctx, "RegisterPipelineProxy", TraceItemArgs::new().kwarg("proxy", sphere));
//! let script = ctx.stop_trace().unwrap();
//!
//! assert!(script.contains("sphere1 = Sphere(registrationName='Sphere1')"));
//! assert!(script.contains("sphere1.Radius = 2.0"));
//! assert!(ctx.active_tracer().is_none());
//! ```

pub mod args;
pub mod config;
pub mod error;
pub mod model;
pub mod policy;
pub mod script;
pub mod sink;
pub mod state;
pub mod trace;

// Re-export main types
pub use args::{ArgumentSet, TraceArg, TraceItemArgs, TraceValue};
pub use config::{StateConfig, TraceConfig};
pub use error::{ErrorCategory, ErrorDetail, ErrorResponse, Result, TraceError};
pub use model::{InMemoryObjectModel, ObjectInfo, ObjectKind, ObjectModel, ObjectRef, PropertyState};
pub use policy::{PropertiesToTrace, TracePolicy};
pub use sink::{DiagnosticSink, MemorySink, StdoutSink, TracingSink};
pub use state::{get_state, StateDump};
pub use trace::{TraceContext, TraceEngine, TraceEvent, TraceItem, TraceItemKind, TracerHandle};
