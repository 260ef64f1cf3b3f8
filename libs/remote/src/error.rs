//! Remote error types

use actor_runtime::RuntimeError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Main remote error type.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// A spawn request named a kind with no registered template on the
    /// receiving node.
    #[error("Unknown kind: {kind}")]
    UnknownKind { kind: String },

    /// The activation request could not be completed.
    #[error("Activation error: {message}")]
    Activation { message: String },

    /// The activator did not answer within the deadline.
    #[error("No activation response within {timeout_ms}ms")]
    NoResponse { timeout_ms: u64 },

    /// The endpoint transport rejected or dropped a delivery.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl RemoteError {
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownKind { kind: kind.into() }
    }

    pub fn activation(message: impl Into<String>) -> Self {
        Self::Activation {
            message: message.into(),
        }
    }

    pub fn no_response(timeout: Duration) -> Self {
        Self::NoResponse {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_errors_convert_transparently() {
        let error: RemoteError = RuntimeError::process_name_exists("worker").into();
        assert!(error.to_string().contains("worker"));
    }

    #[test]
    fn no_response_reports_the_deadline() {
        let error = RemoteError::no_response(Duration::from_millis(250));
        assert!(error.to_string().contains("250"));
    }
}
