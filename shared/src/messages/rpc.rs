//! Remote procedure calls from the worker into the host coordinator

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ContextTarget;

/// Serializable shape of an error raised inside the isolated context
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

/// Lifecycle phase an unhandled error was caught in
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorPhase {
    #[serde(rename = "Preload Error")]
    Preload,
    #[serde(rename = "Cleanup Error")]
    Cleanup,
    #[serde(rename = "Coverage Error")]
    Coverage,
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPhase::Preload => write!(f, "Preload Error"),
            ErrorPhase::Cleanup => write!(f, "Cleanup Error"),
            ErrorPhase::Coverage => write!(f, "Coverage Error"),
        }
    }
}

/// How a mocked module is produced
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MockKind {
    /// Module body comes from a user factory
    Factory,
    /// Every export replaced by an empty mock
    Automock,
    /// Exports kept but wrapped in spies
    Autospy,
}

/// Calls the worker can make into the host
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum RpcRequest {
    Debug {
        messages: Vec<String>,
    },
    OnUnhandledError {
        error: ErrorReport,
        phase: ErrorPhase,
    },
    WdioSwitchContext {
        target: ContextTarget,
    },
    TriggerCommand {
        command: String,
        payload: String,
    },
    #[serde(rename_all = "camelCase")]
    ResolveId {
        raw_id: String,
        importer: String,
    },
    RegisterMock {
        id: String,
        kind: MockKind,
    },
    DeleteMock {
        id: String,
    },
    InvalidateMocks,
}

impl RpcRequest {
    /// Method name as the host registers it
    pub fn method(&self) -> &'static str {
        match self {
            RpcRequest::Debug { .. } => "debug",
            RpcRequest::OnUnhandledError { .. } => "onUnhandledError",
            RpcRequest::WdioSwitchContext { .. } => "wdioSwitchContext",
            RpcRequest::TriggerCommand { .. } => "triggerCommand",
            RpcRequest::ResolveId { .. } => "resolveId",
            RpcRequest::RegisterMock { .. } => "registerMock",
            RpcRequest::DeleteMock { .. } => "deleteMock",
            RpcRequest::InvalidateMocks => "invalidateMocks",
        }
    }
}

/// Host answer to an [`RpcRequest`]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RpcResponse {
    Ack,
    Value { value: String },
    Failed { message: String },
}
