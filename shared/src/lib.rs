//! Shared types for the sandboxed test worker
//!
//! Contains the wire protocol spoken between an isolated test context and the
//! host coordinator, plus the identifiers, configuration and logging helpers
//! both sides agree on.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

// Re-export the wire protocol
pub use messages::{
    // Worker ↔ Host RPC
    ErrorPhase, ErrorReport, MockKind, RpcRequest, RpcResponse,

    // Batch lifecycle and framing
    HostCommand, HostFrame, HostMessage, WorkerFrame,

    // Configuration types
    BrowserSettings, CoverageSettings, WorkerConfig,
};
