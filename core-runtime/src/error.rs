use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A global `tracing` subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error categories visible to RPC clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Bad or missing argument, unknown identifier, referential-integrity
    /// violation, or the host rejected the call. Safe to show verbatim.
    InvalidParams,
    /// The host thread was unreachable or an internal invariant broke.
    InternalError,
}

impl ToolErrorKind {
    /// JSON-RPC 2.0 error code.
    pub fn code(&self) -> i64 {
        match self {
            ToolErrorKind::InvalidParams => -32602,
            ToolErrorKind::InternalError => -32603,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::InvalidParams => "invalid_params",
            ToolErrorKind::InternalError => "internal_error",
        }
    }
}

/// Structured error returned by an operation.
///
/// Produced either while parsing arguments (before any work is queued) or
/// inside a job on the pump thread, in which case it travels back to the
/// waiting worker with kind and message intact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InternalError, message)
    }

    pub fn shutting_down() -> Self {
        Self::internal("Plugin is shutting down.")
    }

    pub fn main_thread_timeout() -> Self {
        Self::internal("Timed out waiting for X-Plane main thread.")
    }

    pub fn is_invalid_params(&self) -> bool {
        self.kind == ToolErrorKind::InvalidParams
    }

    pub fn is_internal(&self) -> bool {
        self.kind == ToolErrorKind::InternalError
    }
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        assert_eq!(ToolErrorKind::InvalidParams.code(), -32602);
        assert_eq!(ToolErrorKind::InternalError.code(), -32603);
        assert_eq!(ToolErrorKind::InvalidParams.as_str(), "invalid_params");
    }

    #[test]
    fn test_display_is_message_only() {
        let err = ToolError::invalid_params("Unknown object_id.");
        assert_eq!(err.to_string(), "Unknown object_id.");
        assert!(err.is_invalid_params());
    }

    #[test]
    fn test_shutdown_errors_are_internal() {
        assert!(ToolError::shutting_down().is_internal());
        assert!(ToolError::main_thread_timeout().is_internal());
        assert!(ToolError::main_thread_timeout()
            .message
            .contains("Timed out"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ToolErrorKind::InternalError).unwrap();
        assert_eq!(json, "\"internal_error\"");
    }
}
