//! Shared error types for the worker and the host

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;

/// Failure of the raw channel between the context and the host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Host channel is not connected")]
    Disconnected,

    #[error("Host channel closed before a response arrived")]
    Closed,

    #[error("Frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Transport I/O failed: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        TransportError::Io { message: error.to_string() }
    }
}
