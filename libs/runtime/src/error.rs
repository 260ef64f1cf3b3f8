//! Runtime error types
//!
//! Sends to dead targets are not errors: they are absorbed by the
//! dead-letter process. Errors here surface from behavior invocation (and
//! are escalated, not thrown at senders) and from the spawn path.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Main runtime error type.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A failure raised while executing a system message or a user batch.
    /// Caught at the turn boundary and reported through the invoker's
    /// escalation channel together with the offending item.
    #[error("Invocation failure: {message}")]
    Invocation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A process is already registered under this id.
    #[error("Process name already in use: {id}")]
    ProcessNameExists { id: String },

    /// No construction template is registered for this kind.
    #[error("Unknown kind: {kind}")]
    UnknownKind { kind: String },
}

impl RuntimeError {
    /// Create an invocation failure.
    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invocation failure with an underlying cause.
    pub fn invocation_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Invocation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn process_name_exists(id: impl Into<String>) -> Self {
        Self::ProcessNameExists { id: id.into() }
    }

    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownKind { kind: kind.into() }
    }
}
