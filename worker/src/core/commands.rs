//! Browser commands issued by tests
//!
//! Commands (simulated user input, screenshots, file access) are executed by
//! the host. Hooks registered with [`CommandManager::on_command`] run before
//! every command is forwarded and can delay it, e.g. to switch the driver
//! context first.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::Mutex;

use shared::context_debug;

use super::rpc_bridge::RpcBridge;
use crate::error::WorkerResult;

/// Hook awaited before a command is forwarded, receives the command name
pub type CommandHook = Arc<dyn Fn(String) -> BoxFuture<'static, WorkerResult<()>> + Send + Sync>;

/// Per-batch dispatcher for browser commands
pub struct CommandManager {
    hooks: Mutex<Vec<CommandHook>>,
    rpc: RpcBridge,
}

impl CommandManager {
    pub fn new(rpc: RpcBridge) -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
            rpc,
        }
    }

    pub async fn on_command(&self, hook: CommandHook) {
        self.hooks.lock().await.push(hook);
    }

    pub async fn hook_count(&self) -> usize {
        self.hooks.lock().await.len()
    }

    /// Run every hook in registration order, then forward the command
    pub async fn trigger_command(&self, command: &str, payload: String) -> WorkerResult<Option<String>> {
        let hooks = self.hooks.lock().await.clone();
        for hook in hooks {
            hook(command.to_string()).await?;
        }

        context_debug!(self.rpc.context_id(), "🖱️ Triggering command {}", command);
        self.rpc.trigger_command(command, payload).await
    }
}
