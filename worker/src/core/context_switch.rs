//! Lazy driver context switching
//!
//! Drivers with a single active browsing context have to be pointed at the
//! isolated frame before they can simulate input in it. The switch is deferred
//! to the first command so batches without user input pay nothing.

use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::OnceCell;

use shared::ContextTarget;

use super::commands::CommandHook;
use super::rpc_bridge::RpcBridge;
use crate::error::WorkerResult;

/// Single-flight guard around the switch into the isolated frame
///
/// Concurrent callers share one in-flight switch. A completed switch is
/// memoized for the rest of the batch; a failed one leaves the guard empty so
/// the next command tries again. A batch therefore sends at most one successful
/// `iframe` switch, plus one extra attempt per failed switch.
pub struct ContextSwitcher {
    rpc: RpcBridge,
    switched: OnceCell<()>,
}

impl ContextSwitcher {
    pub fn new(rpc: RpcBridge) -> Self {
        Self {
            rpc,
            switched: OnceCell::new(),
        }
    }

    pub async fn ensure_isolated(&self) -> WorkerResult<()> {
        self.switched
            .get_or_try_init(|| self.rpc.switch_context(ContextTarget::Iframe))
            .await
            .map(|_| ())
    }

    pub fn is_switched(&self) -> bool {
        self.switched.initialized()
    }

    /// Hand the driver back to the host page if this batch took it
    pub async fn restore(&self) -> WorkerResult<()> {
        if self.is_switched() {
            self.rpc.switch_context(ContextTarget::Parent).await?;
        }
        Ok(())
    }

    /// Command hook that switches before the first command goes out
    pub fn command_hook(self: &Arc<Self>) -> CommandHook {
        let switcher = Arc::clone(self);
        Arc::new(move |_command: String| {
            let switcher = Arc::clone(&switcher);
            async move { switcher.ensure_isolated().await }.boxed()
        })
    }
}
