//! Message types for the worker ↔ host protocol
//!
//! This module organizes all messages by category:
//! - `rpc`: typed remote calls the worker makes into the host
//! - `host`: batch triggers, the completion notification and transport framing
//! - `config`: configuration handed to the worker

pub mod config;
pub mod host;
pub mod rpc;

pub use config::{BrowserSettings, CoverageSettings, WorkerConfig};

pub use host::{HostCommand, HostFrame, HostMessage, WorkerFrame};

pub use rpc::{ErrorPhase, ErrorReport, MockKind, RpcRequest, RpcResponse};
