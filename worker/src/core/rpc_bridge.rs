//! Safety-wrapped RPC calls into the host coordinator
//!
//! The bridge refuses to send when the channel is down, turns remote failures
//! into [`WorkerError::Rpc`] and offers a best-effort [`RpcBridge::report`]
//! that never fails, so reporting an error can not break the batch it reports on.

use std::sync::Arc;

use shared::{
    context_debug, context_warn, ContextId, ContextTarget, ErrorPhase, ErrorReport, MockKind, RpcRequest, RpcResponse,
    TransportError,
};

use crate::error::{WorkerError, WorkerResult};
use crate::traits::HostChannel;

/// Typed RPC handle over a raw [`HostChannel`]
#[derive(Clone)]
pub struct RpcBridge {
    channel: Arc<dyn HostChannel>,
    context_id: ContextId,
}

impl RpcBridge {
    pub fn new(channel: Arc<dyn HostChannel>, context_id: ContextId) -> Self {
        Self { channel, context_id }
    }

    pub fn context_id(&self) -> &ContextId {
        &self.context_id
    }

    async fn call(&self, request: RpcRequest) -> WorkerResult<RpcResponse> {
        if !self.channel.is_connected() {
            return Err(TransportError::Disconnected.into());
        }

        let method = request.method();
        match self.channel.request(request).await? {
            RpcResponse::Failed { message } => Err(WorkerError::Rpc {
                method: method.to_string(),
                message,
            }),
            response => Ok(response),
        }
    }

    async fn call_value(&self, request: RpcRequest) -> WorkerResult<Option<String>> {
        match self.call(request).await? {
            RpcResponse::Value { value } => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    pub async fn debug(&self, messages: Vec<String>) -> WorkerResult<()> {
        self.call(RpcRequest::Debug { messages }).await.map(|_| ())
    }

    pub async fn on_unhandled_error(&self, error: ErrorReport, phase: ErrorPhase) -> WorkerResult<()> {
        self.call(RpcRequest::OnUnhandledError { error, phase }).await.map(|_| ())
    }

    /// Move the automation driver's active context
    pub async fn switch_context(&self, target: ContextTarget) -> WorkerResult<()> {
        context_debug!(self.context_id, "🔀 Switching driver context to {}", target);
        self.call(RpcRequest::WdioSwitchContext { target }).await.map(|_| ())
    }

    pub async fn trigger_command(&self, command: &str, payload: String) -> WorkerResult<Option<String>> {
        self.call_value(RpcRequest::TriggerCommand {
            command: command.to_string(),
            payload,
        })
        .await
    }

    /// Ask the host to resolve an import specifier, `None` when it can not
    pub async fn resolve_id(&self, raw_id: &str, importer: &str) -> WorkerResult<Option<String>> {
        self.call_value(RpcRequest::ResolveId {
            raw_id: raw_id.to_string(),
            importer: importer.to_string(),
        })
        .await
    }

    pub async fn register_mock(&self, id: &str, kind: MockKind) -> WorkerResult<()> {
        self.call(RpcRequest::RegisterMock { id: id.to_string(), kind })
            .await
            .map(|_| ())
    }

    pub async fn delete_mock(&self, id: &str) -> WorkerResult<()> {
        self.call(RpcRequest::DeleteMock { id: id.to_string() }).await.map(|_| ())
    }

    pub async fn invalidate_mocks(&self) -> WorkerResult<()> {
        self.call(RpcRequest::InvalidateMocks).await.map(|_| ())
    }

    /// Report an error to the host; a failed report is only logged locally
    pub async fn report(&self, error: &WorkerError, phase: ErrorPhase) {
        if let Err(report_error) = self.on_unhandled_error(error.to_report(), phase).await {
            context_warn!(
                self.context_id,
                "⚠️ Could not report {} ({}) to host: {}",
                phase,
                error,
                report_error
            );
        }
    }
}
