//! Module interceptor that lives on the host
//!
//! The host's module server rewrites imports for mocked ids, so registrations
//! are simply forwarded over RPC.

use async_trait::async_trait;

use shared::MockKind;

use crate::core::RpcBridge;
use crate::error::WorkerResult;
use crate::traits::ModuleInterceptor;

pub struct RpcMockInterceptor {
    rpc: RpcBridge,
}

impl RpcMockInterceptor {
    pub fn new(rpc: RpcBridge) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl ModuleInterceptor for RpcMockInterceptor {
    async fn register(&self, id: &str, kind: MockKind) -> WorkerResult<()> {
        self.rpc.register_mock(id, kind).await
    }

    async fn delete(&self, id: &str) -> WorkerResult<()> {
        self.rpc.delete_mock(id).await
    }

    async fn invalidate(&self) -> WorkerResult<()> {
        self.rpc.invalidate_mocks().await
    }
}
