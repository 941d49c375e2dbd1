//! Scoped trace items
//!
//! A trace item is created at the call site, fed one argument set and commits
//! to the active tracer when it goes out of scope:
//!
//! ```rust
//! use std::sync::Arc;
//! use smtrace_core::{scoped_trace, InMemoryObjectModel, TraceContext, TraceItemArgs};
//!
//! let ctx = TraceContext::new(Arc::new(InMemoryObjectModel::new()));
//! ctx.start_trace();
//! {
//!     scoped_trace!(ctx, CallFunction, TraceItemArgs::new().arg("ResetSession"));
//!     // ... the traced operation runs here ...
//! }
//! assert!(ctx.current_trace().unwrap().contains("ResetSession()"));
//! ```
//!
//! Committing on scope exit means the item sees the state left behind by the
//! operation it wraps. Items that share a scope commit in reverse order of
//! creation, so nested operations belong in nested scopes.

use tracing::warn;

use crate::args::{ArgumentSet, TraceItemArgs};

use super::context::TraceContext;
use super::event::TraceEvent;

/// One recordable event, committed on drop
///
/// Neither `Clone` nor `Copy`: each item commits at most once.
#[must_use = "a trace item commits when dropped; bind it to keep it alive for the traced scope"]
pub struct TraceItem<'a> {
    context: &'a TraceContext,
    item_type: &'a str,
    args: Option<ArgumentSet>,
    finalized: bool,
}

impl<'a> TraceItem<'a> {
    pub fn new(context: &'a TraceContext, item_type: &'a str) -> Self {
        Self {
            context,
            item_type,
            args: None,
            finalized: false,
        }
    }

    /// Record immediately: construct, feed and drop in one call
    pub fn record(context: &TraceContext, item_type: &str, args: TraceItemArgs) {
        let mut item = TraceItem::new(context, item_type);
        item.set_args(args);
    }

    pub fn item_type(&self) -> &str {
        self.item_type
    }

    /// Finalize the item with its arguments
    ///
    /// Only the first call counts; later calls are ignored.
    pub fn set_args(&mut self, args: TraceItemArgs) {
        if self.finalized {
            warn!(item = self.item_type, "trace item already has arguments, ignoring");
            return;
        }
        self.finalized = true;
        // skip building the set entirely when nobody is listening
        if self.context.is_tracing() {
            self.args = Some(args.into_set());
        }
    }
}

impl Drop for TraceItem<'_> {
    fn drop(&mut self) {
        let Some(args) = self.args.take() else {
            return;
        };
        if let Some(tracer) = self.context.active_tracer() {
            tracer.record(&TraceEvent::from_set(self.item_type, args));
        }
    }
}

/// Record a trace item for the rest of the enclosing scope
///
/// `scoped_trace!(ctx, Show, TraceItemArgs::new().kwarg("producer", obj))`
/// binds a hidden [`TraceItem`] in the caller's scope. It commits when that
/// scope ends.
#[macro_export]
macro_rules! scoped_trace {
    ($context:expr, $item_type:ident, $args:expr) => {
        let mut __scoped_trace_item = $crate::TraceItem::new(&$context, stringify!($item_type));
        __scoped_trace_item.set_args($args);
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::InMemoryObjectModel;
    use crate::script::TRACE_PREAMBLE;
    use crate::sink::MemorySink;

    fn context() -> TraceContext {
        TraceContext::new(Arc::new(InMemoryObjectModel::new()))
            .with_sink(Arc::new(MemorySink::new()))
    }

    #[test]
    fn test_commit_happens_on_drop() {
        let ctx = context();
        ctx.start_trace();

        let mut item = TraceItem::new(&ctx, "TraceText");
        item.set_args(TraceItemArgs::new().arg("# later"));
        assert_eq!(ctx.current_trace().unwrap(), TRACE_PREAMBLE);

        drop(item);
        assert!(ctx.current_trace().unwrap().ends_with("# later\n"));
    }

    #[test]
    fn test_second_set_args_ignored() {
        let ctx = context();
        ctx.start_trace();
        {
            let mut item = TraceItem::new(&ctx, "TraceText");
            item.set_args(TraceItemArgs::new().arg("# first"));
            item.set_args(TraceItemArgs::new().arg("# second"));
        }
        let script = ctx.stop_trace().unwrap();
        assert!(script.contains("# first"));
        assert!(!script.contains("# second"));
    }

    #[test]
    fn test_item_without_args_records_nothing() {
        let ctx = context();
        ctx.start_trace();
        {
            let _item = TraceItem::new(&ctx, "TraceText");
        }
        assert_eq!(ctx.active_tracer().unwrap().lock().events_recorded(), 0);
    }

    #[test]
    fn test_no_tracer_is_silent() {
        let ctx = context();
        TraceItem::record(&ctx, "TraceText", TraceItemArgs::new().arg("# ignored"));
        TraceItem::record(&ctx, "NotAnItem", TraceItemArgs::new());
        assert!(ctx.active_tracer().is_none());
    }

    #[test]
    fn test_scoped_macro_commits_at_scope_exit() {
        let ctx = context();
        ctx.start_trace();
        {
            scoped_trace!(ctx, TraceText, TraceItemArgs::new().arg("# inside"));
            assert_eq!(ctx.current_trace().unwrap(), TRACE_PREAMBLE);
        }
        assert!(ctx.current_trace().unwrap().contains("# inside"));
    }

    #[test]
    fn test_sequential_scopes_keep_order() {
        let ctx = context();
        ctx.start_trace();
        for line in ["# a", "# b", "# c"] {
            scoped_trace!(ctx, TraceText, TraceItemArgs::new().arg(line));
        }
        let script = ctx.stop_trace().unwrap();
        assert_eq!(script, format!("{}# a\n# b\n# c\n", TRACE_PREAMBLE));
    }
}
