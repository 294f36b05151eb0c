//! Worker-specific error types

use shared::{ErrorReport, SharedError, TransportError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    /// Failure raised by code running inside the isolated context
    #[error("{name}: {message}")]
    Thrown {
        name: String,
        message: String,
        stack: Option<String>,
    },

    #[error("Host transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("RPC call {method} failed: {message}")]
    Rpc { method: String, message: String },

    #[error("Configuration error: {field}")]
    Configuration { field: String },

    #[error("Invalid context address: {message}")]
    Location { message: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn thrown(name: impl Into<String>, message: impl Into<String>) -> Self {
        WorkerError::Thrown {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn config(field: impl Into<String>) -> Self {
        WorkerError::Configuration { field: field.into() }
    }

    /// Name the host displays for this error
    pub fn name(&self) -> &str {
        match self {
            WorkerError::Thrown { name, .. } => name,
            WorkerError::Transport(_) => "TransportError",
            WorkerError::Rpc { .. } => "RpcError",
            WorkerError::Configuration { .. } => "ConfigurationError",
            WorkerError::Location { .. } => "LocationError",
            WorkerError::Shared(_) => "SharedError",
            WorkerError::Io(_) => "IoError",
            WorkerError::Json(_) => "SerializationError",
        }
    }

    /// Convert into the wire shape sent with `onUnhandledError`
    pub fn to_report(&self) -> ErrorReport {
        match self {
            WorkerError::Thrown { name, message, stack } => ErrorReport {
                name: name.clone(),
                message: message.clone(),
                stack: stack.clone(),
            },
            other => ErrorReport {
                name: other.name().to_string(),
                message: other.to_string(),
                stack: Some(format!("{other:?}")),
            },
        }
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
