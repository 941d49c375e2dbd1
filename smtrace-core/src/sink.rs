//! Diagnostic sinks for live trace output
//!
//! When a tracer's `log_to_stdout` policy is set, every freshly rendered
//! statement is also written to a sink. The sink never affects the
//! accumulated script.

use parking_lot::Mutex;

/// Destination for statements echoed while tracing
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, text: &str);

    /// Sink name (for logging/debugging)
    fn name(&self) -> &'static str;
}

/// Writes to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl DiagnosticSink for StdoutSink {
    fn emit(&self, text: &str) {
        println!("{}", text);
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

/// Forwards to the `tracing` subscriber at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, text: &str) {
        tracing::info!(target: "smtrace::live", "{}", text);
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
