//! Trait definitions with mockall annotations for testing
//!
//! Every collaborator the worker talks to but does not own sits behind one of
//! these traits: the host channel, the test runner, coverage instrumentation,
//! module interception and the in-page side-effect hooks. The worker receives
//! them as `Arc<dyn Trait>` so tests can swap in mocks or recording fakes.

use std::sync::Arc;

use shared::{
    CancelReason, CoverageSettings, HostMessage, MockKind, RpcRequest, RpcResponse, TransportError, WorkerConfig,
};

use crate::core::{CommandManager, ModuleMocker, RpcBridge};
use crate::error::WorkerResult;

/// Everything a runner needs to be built for one batch
#[derive(Clone)]
pub struct RunnerContext {
    pub files: Vec<String>,
    pub config: Arc<WorkerConfig>,
    pub mocker: Arc<ModuleMocker>,
    /// Dispatcher tests use to issue browser commands
    pub commands: Arc<CommandManager>,
    pub rpc: RpcBridge,
}

/// Raw bidirectional channel to the host coordinator
#[mockall::automock]
#[async_trait::async_trait]
pub trait HostChannel: Send + Sync {
    /// Suspend until the host accepted the connection; no timeout
    async fn wait_for_connection(&self);

    fn is_connected(&self) -> bool;

    /// Send one RPC request and wait for the matching response
    async fn request(&self, request: RpcRequest) -> Result<RpcResponse, TransportError>;

    /// Post a fire-and-forget message to the host
    async fn post(&self, message: HostMessage) -> Result<(), TransportError>;
}

/// Test-runner library instance for one batch
#[mockall::automock]
#[async_trait::async_trait]
pub trait TestRunner: Send + Sync {
    /// Execute every test in the file
    async fn run_file(&self, file: &str) -> WorkerResult<()>;

    /// Discover the tests in the file without executing them
    async fn collect_file(&self, file: &str) -> WorkerResult<()>;

    /// Cancellation hook; runners without one ignore the signal
    fn on_cancel(&self, _reason: CancelReason) {}
}

/// Builds the runner once the environment is in place
#[mockall::automock]
#[async_trait::async_trait]
pub trait RunnerFactory: Send + Sync {
    async fn create_runner(&self, context: RunnerContext) -> WorkerResult<Arc<dyn TestRunner>>;
}

/// Coverage instrumentation inside the context
#[mockall::automock]
#[async_trait::async_trait]
pub trait CoverageProvider: Send + Sync {
    async fn start_coverage(&self, settings: &CoverageSettings, isolate: bool) -> WorkerResult<()>;

    async fn stop_coverage(&self, settings: &CoverageSettings, isolate: bool) -> WorkerResult<()>;
}

/// Module-resolution hook the mocker drives
#[mockall::automock]
#[async_trait::async_trait]
pub trait ModuleInterceptor: Send + Sync {
    async fn register(&self, id: &str, kind: MockKind) -> WorkerResult<()>;

    async fn delete(&self, id: &str) -> WorkerResult<()>;

    /// Drop every registration
    async fn invalidate(&self) -> WorkerResult<()>;
}

/// Creates spies around a module's exports
#[mockall::automock]
pub trait SpyFactory: Send + Sync {
    fn spy_on_module(&self, module_id: &str) -> WorkerResult<()>;
}

/// Console and dialog interception
#[mockall::automock]
pub trait SideEffectSpy: Send + Sync {
    fn setup_console(&self) -> WorkerResult<()>;

    fn setup_dialogs(&self) -> WorkerResult<()>;
}

/// Common execution environment shared by every file of a batch
#[mockall::automock]
#[async_trait::async_trait]
pub trait EnvironmentSetup: Send + Sync {
    async fn setup_common_env(&self, config: &WorkerConfig) -> WorkerResult<()>;

    /// Make the test library namespace reachable from code under test
    async fn expose_namespace(&self) -> WorkerResult<()>;
}

/// Stateful keyboard and pointer simulation
#[mockall::automock]
#[async_trait::async_trait]
pub trait UserEventCleanup: Send + Sync {
    /// Release pressed keys and buttons left over from the batch
    async fn cleanup(&self) -> WorkerResult<()>;
}

/// Component cleanup hook registered on the page
#[mockall::automock]
pub trait PageCleanup: Send + Sync {
    fn cleanup(&self) -> WorkerResult<()>;
}
