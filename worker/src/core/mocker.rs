//! Module mocking inside the isolated context
//!
//! Tests queue mock and unmock requests while they are being imported; the
//! runner flushes the queue with [`ModuleMocker::prepare`] before it imports
//! the next module. Resolution of import specifiers is done by the host, the
//! actual rewriting by the [`ModuleInterceptor`] capability.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use shared::{context_debug, MockKind};

use super::rpc_bridge::RpcBridge;
use crate::error::WorkerResult;
use crate::traits::{ModuleInterceptor, SpyFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockAction {
    Mock(MockKind),
    Unmock,
}

#[derive(Debug, Clone)]
struct PendingMock {
    raw_id: String,
    importer: String,
    action: MockAction,
}

/// Per-batch mocker bound to an interceptor, the RPC bridge and a spy factory
pub struct ModuleMocker {
    interceptor: Arc<dyn ModuleInterceptor>,
    rpc: RpcBridge,
    spies: Arc<dyn SpyFactory>,
    root: PathBuf,
    queue: Mutex<Vec<PendingMock>>,
    registry: Mutex<HashMap<String, MockKind>>,
}

impl ModuleMocker {
    pub fn new(
        interceptor: Arc<dyn ModuleInterceptor>,
        rpc: RpcBridge,
        spies: Arc<dyn SpyFactory>,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            interceptor,
            rpc,
            spies,
            root: root.into(),
            queue: Mutex::new(Vec::new()),
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub async fn queue_mock(&self, raw_id: &str, importer: &str, kind: MockKind) {
        self.queue.lock().await.push(PendingMock {
            raw_id: raw_id.to_string(),
            importer: importer.to_string(),
            action: MockAction::Mock(kind),
        });
    }

    pub async fn queue_unmock(&self, raw_id: &str, importer: &str) {
        self.queue.lock().await.push(PendingMock {
            raw_id: raw_id.to_string(),
            importer: importer.to_string(),
            action: MockAction::Unmock,
        });
    }

    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Apply every queued request in order
    ///
    /// On failure the failed request and everything after it stay queued.
    pub async fn prepare(&self) -> WorkerResult<()> {
        let mut pending = std::mem::take(&mut *self.queue.lock().await);

        for index in 0..pending.len() {
            if let Err(error) = self.apply(&pending[index]).await {
                let rest = pending.split_off(index);
                self.queue.lock().await.splice(0..0, rest);
                return Err(error);
            }
        }

        Ok(())
    }

    async fn apply(&self, entry: &PendingMock) -> WorkerResult<()> {
        let resolved = self
            .rpc
            .resolve_id(&entry.raw_id, &entry.importer)
            .await?
            .unwrap_or_else(|| entry.raw_id.clone());
        let id = self.normalize(&resolved);

        match entry.action {
            MockAction::Mock(kind) => {
                self.interceptor.register(&id, kind).await?;
                if kind == MockKind::Autospy {
                    self.spies.spy_on_module(&id)?;
                }
                context_debug!(self.rpc.context_id(), "🎭 Mocked {} ({:?})", id, kind);
                self.registry.lock().await.insert(id, kind);
            }
            MockAction::Unmock => {
                self.interceptor.delete(&id).await?;
                context_debug!(self.rpc.context_id(), "🎭 Unmocked {}", id);
                self.registry.lock().await.remove(&id);
            }
        }
        Ok(())
    }

    /// Forget every mock and drop the interceptor's registrations
    pub async fn reset(&self) -> WorkerResult<()> {
        self.queue.lock().await.clear();
        self.registry.lock().await.clear();
        self.interceptor.invalidate().await
    }

    pub async fn is_mocked(&self, id: &str) -> bool {
        self.registry.lock().await.contains_key(&self.normalize(id))
    }

    pub async fn mock_kind(&self, id: &str) -> Option<MockKind> {
        self.registry.lock().await.get(&self.normalize(id)).copied()
    }

    /// Key ids under the project root relative to it, with a leading slash
    fn normalize(&self, id: &str) -> String {
        if self.root.as_os_str().is_empty() {
            return id.to_string();
        }
        match Path::new(id).strip_prefix(&self.root) {
            Ok(relative) => {
                let parts: Vec<String> = relative
                    .components()
                    .map(|part| part.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("/{}", parts.join("/"))
            }
            Err(_) => id.to_string(),
        }
    }
}
