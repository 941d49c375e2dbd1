//! Error types for trace operations
//!
//! Every variant carries a stable error code and a category so that callers
//! embedding the tracer (a UI, a scripting bridge, the CLI) can react to
//! failures without matching on message text.
//!
//! # Example
//!
//! ```rust
//! use smtrace_core::error::{TraceError, ErrorCategory};
//!
//! fn report(err: TraceError) {
//!     match err.category() {
//!         ErrorCategory::State => println!("tracer not in the right state"),
//!         ErrorCategory::Render => println!("script generation failed"),
//!         _ => println!("other error"),
//!     }
//!     println!("{}: {}", err.error_code(), err);
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for trace operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The tracer is not in a state that allows the operation
    State,
    /// Script generation failed
    Render,
    /// An object referenced by an event is unknown to the object model
    NotFound,
    /// Configuration could not be parsed or is out of range
    Configuration,
    /// Serialization or I/O failed
    External,
}

/// Errors that can occur while tracing
#[derive(Error, Debug)]
pub enum TraceError {
    // ═══════════════════════════════════════════════════════════════════════
    // Session state errors
    // ═══════════════════════════════════════════════════════════════════════

    /// Query or stop without an active tracer
    #[error("No active tracer. Call start_trace() before querying or stopping the trace.")]
    NoActiveTracer,

    /// State dump requested while incremental tracing is running
    #[error("Cannot save state while tracing is active. Stop the trace first.")]
    ConcurrentTracing,

    // ═══════════════════════════════════════════════════════════════════════
    // Rendering errors
    // ═══════════════════════════════════════════════════════════════════════

    /// Script generation failed; the session is marked as errored
    #[error("Trace rendering failed: {reason}")]
    Render { reason: String },

    /// Object id is not present in the object model
    #[error("Object not found: {object_id}. The object may have been deleted.")]
    ObjectNotFound { object_id: u64 },

    // ═══════════════════════════════════════════════════════════════════════
    // Infrastructure errors
    // ═══════════════════════════════════════════════════════════════════════

    /// Configuration is malformed
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// JSON serialization or deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation failed
    #[error("IO error: {message}")]
    Io { message: String },
}

impl TraceError {
    /// Shorthand for building a render error
    pub fn render(reason: impl Into<String>) -> Self {
        TraceError::Render {
            reason: reason.into(),
        }
    }

    /// Returns true if the operation may succeed once the tracer state changes
    ///
    /// `NoActiveTracer` and `ConcurrentTracing` depend only on whether a
    /// session is running. Render errors are sticky for the session that
    /// produced them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TraceError::NoActiveTracer | TraceError::ConcurrentTracing
        )
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            TraceError::NoActiveTracer | TraceError::ConcurrentTracing => ErrorCategory::State,
            TraceError::Render { .. } => ErrorCategory::Render,
            TraceError::ObjectNotFound { .. } => ErrorCategory::NotFound,
            TraceError::InvalidConfig { .. } => ErrorCategory::Configuration,
            TraceError::Json(_) | TraceError::Io { .. } => ErrorCategory::External,
        }
    }

    /// Returns the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            TraceError::NoActiveTracer => "NO_ACTIVE_TRACER",
            TraceError::ConcurrentTracing => "CONCURRENT_TRACING",
            TraceError::Render { .. } => "RENDER_ERROR",
            TraceError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            TraceError::InvalidConfig { .. } => "INVALID_CONFIG",
            TraceError::Json(_) => "JSON_ERROR",
            TraceError::Io { .. } => "IO_ERROR",
        }
    }

    /// Converts this error to a JSON-serializable response object
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                recoverable: self.is_recoverable(),
            },
        }
    }
}

impl From<std::io::Error> for TraceError {
    fn from(err: std::io::Error) -> Self {
        TraceError::Io {
            message: err.to_string(),
        }
    }
}

/// JSON-serializable error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail for JSON responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable error code (e.g., "NO_ACTIVE_TRACER")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Error category
    pub category: ErrorCategory,
    /// Whether retry might succeed
    pub recoverable: bool,
}
