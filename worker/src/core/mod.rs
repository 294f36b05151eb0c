//! Core building blocks of a batch
//!
//! These components have no I/O of their own; everything external goes through
//! the traits in [`crate::traits`].

pub mod commands;
pub mod context_switch;
pub mod coverage;
pub mod mocker;
pub mod rpc_bridge;
pub mod versions;

pub use commands::{CommandHook, CommandManager};
pub use context_switch::ContextSwitcher;
pub use coverage::CoverageLifecycle;
pub use mocker::ModuleMocker;
pub use rpc_bridge::RpcBridge;
pub use versions::{VersionEntry, VersionRegistry};
