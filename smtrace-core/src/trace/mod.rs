//! Incremental tracing
//!
//! Call sites describe user-visible state changes as trace items. While a
//! tracer is active, each item is rendered into Python and appended to the
//! session's script. When no tracer is active, recording does nothing.
//!
//! ## Architecture
//!
//! ```text
//! Call site                      TraceContext               TraceEngine
//! ─────────                      ────────────               ───────────
//! TraceItem::new(ctx, "Show") ─► active tracer? ── no ─► (dropped, nothing recorded)
//!   .set_args(args)                   │
//!   (drop) ───────────────────────────┴── yes ─► lock ─► filter by policy
//!                                                        render statements
//!                                                        append to script
//!                                                        echo to sink (optional)
//! ```
//!
//! ## Key Properties
//!
//! - **At most one tracer**: `start_trace` is idempotent
//! - **Arrival order**: statements are appended in the order items commit
//! - **Opt-in**: without an active tracer, recording has no side effects
//! - **Sticky errors**: a failed render stops the session and is reported on
//!   the next query or stop

mod context;
mod engine;
mod event;
mod item;

pub use context::{TraceContext, TracerHandle};
pub use engine::TraceEngine;
pub use event::{TraceEvent, TraceItemKind};
pub use item::TraceItem;
