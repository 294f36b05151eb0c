//! Service implementations
//!
//! Real implementations of the collaborator traits used by the `worker`
//! binary. Tests use mocks or the recording fakes in `tests/common` instead.

pub mod process_env;
pub mod process_runner;
pub mod rpc_interceptor;
pub mod tcp_channel;

// Re-export all service implementations
pub use process_env::ProcessEnvironment;
pub use process_runner::{ProcessRunnerFactory, ProcessTestRunner};
pub use rpc_interceptor::RpcMockInterceptor;
pub use tcp_channel::TcpHostChannel;
