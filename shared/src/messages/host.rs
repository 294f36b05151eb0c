//! Batch triggers, completion notifications and transport framing
//!
//! The worker posts exactly one [`HostMessage::Done`] per batch. Frames wrap
//! both directions of the socket so requests can be correlated with responses.

use serde::{Deserialize, Serialize};

use super::rpc::{RpcRequest, RpcResponse};
use crate::types::{CancelReason, ContextId};

/// Notification posted from the context to the host
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostMessage {
    /// Batch finished, emitted once on every code path except a reload
    Done { filenames: Vec<String>, id: ContextId },
}

/// Commands the host sends to the context
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostCommand {
    RunFiles { files: Vec<String> },
    CollectFiles { files: Vec<String> },
    Cancel { reason: CancelReason },
    /// Reload the context from a new address
    Reload { url: String },
    Shutdown,
}

/// Frame written by the worker
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "frame", rename_all = "camelCase")]
pub enum WorkerFrame {
    Hello {
        id: ContextId,
    },
    #[serde(rename_all = "camelCase")]
    Request {
        call_id: u64,
        request: RpcRequest,
    },
    Message {
        message: HostMessage,
    },
}

/// Frame written by the host
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "frame", rename_all = "camelCase")]
pub enum HostFrame {
    #[serde(rename_all = "camelCase")]
    Response {
        call_id: u64,
        response: RpcResponse,
    },
    Command {
        command: HostCommand,
    },
}
