//! Test-execution worker for one isolated browser context
//!
//! This library sequences test batches inside an isolated context: it prepares
//! the environment, runs or collects every file in order, brackets coverage,
//! cleans up and reports back to the host coordinator over a message channel.

pub mod config;
pub mod core;
pub mod environment;
pub mod error;
pub mod services;
pub mod session;
pub mod state;
pub mod traits;
pub mod worker;

// Re-export commonly used types
pub use config::{load_config, ContextLocation};
pub use crate::core::{
    CommandManager, ContextSwitcher, CoverageLifecycle, ModuleMocker, RpcBridge, VersionEntry, VersionRegistry,
};
pub use environment::{EnvironmentPreparer, Preparation, PreparedRun};
pub use error::{WorkerError, WorkerResult};
pub use session::HostSession;
pub use state::{BrowserState, PrepareTiming, WorkerState, WorkerStateSnapshot};
pub use traits::{
    CoverageProvider, EnvironmentSetup, HostChannel, ModuleInterceptor, PageCleanup, RunnerContext, RunnerFactory,
    SideEffectSpy, SpyFactory, TestRunner, UserEventCleanup,
};
pub use worker::{BatchOutcome, BrowserWorker, WorkerServices};
