//! Dispatch of host commands to the current worker
//!
//! Batches are queued behind the one in flight instead of being awaited, so
//! cancel, reload and shutdown commands are handled while a batch runs.

use std::sync::Arc;

use tokio::task::JoinHandle;

use shared::{context_info, context_warn, logging, ContextId, ExecutionMode, HostCommand, WorkerConfig};

use crate::config::{self, ContextLocation};
use crate::worker::{BatchOutcome, BrowserWorker, WorkerServices};

pub struct HostSession {
    worker: Arc<BrowserWorker>,
    config: WorkerConfig,
    services: WorkerServices,
    in_flight: Option<JoinHandle<BatchOutcome>>,
}

impl HostSession {
    pub fn new(location: ContextLocation, config: WorkerConfig, services: WorkerServices) -> Self {
        Self {
            worker: Arc::new(BrowserWorker::new(location, config.clone(), services.clone())),
            config,
            services,
            in_flight: None,
        }
    }

    /// Worker that receives new batches and cancels
    pub fn worker(&self) -> &Arc<BrowserWorker> {
        &self.worker
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Handle one command, returns false once the host asked to stop
    pub async fn handle(&mut self, command: HostCommand) -> bool {
        match command {
            HostCommand::RunFiles { files } => self.enqueue(ExecutionMode::Run, files),
            HostCommand::CollectFiles { files } => self.enqueue(ExecutionMode::Collect, files),
            HostCommand::Cancel { reason } => {
                if !self.worker.cancel(reason).await {
                    context_info!(self.worker.context_id(), "⏹️ Cancel ignored, already cancelled");
                }
            }
            HostCommand::Reload { url } => self.reload(&url),
            HostCommand::Shutdown => return false,
        }
        true
    }

    fn enqueue(&mut self, mode: ExecutionMode, files: Vec<String>) {
        let previous = self.in_flight.take();
        let worker = self.worker.clone();
        self.in_flight = Some(tokio::spawn(async move {
            finish(previous, worker.context_id()).await;
            worker.execute(mode, files).await
        }));
    }

    /// Swap in a worker for the new address; a bad address keeps the current one
    fn reload(&mut self, url: &str) {
        let location = match ContextLocation::parse(url) {
            Ok(location) => location,
            Err(e) => {
                logging::log_error(self.worker.context_id(), "Reload", &e);
                return;
            }
        };

        self.worker.request_reload();
        config::describe(&location);
        self.worker = Arc::new(BrowserWorker::new(location, self.config.clone(), self.services.clone()));
    }

    /// Wait for every queued batch
    pub async fn drain(&mut self) {
        finish(self.in_flight.take(), self.worker.context_id()).await;
    }
}

/// Wait for a batch and log how it ended
async fn finish(handle: Option<JoinHandle<BatchOutcome>>, context_id: &ContextId) {
    let Some(handle) = handle else {
        return;
    };

    match handle.await {
        Ok(BatchOutcome::Completed) => logging::log_success(context_id, "Batch completed"),
        Ok(BatchOutcome::Failed { error }) => logging::log_error(context_id, "Batch", &error),
        Ok(BatchOutcome::PreloadFailed) => context_warn!(context_id, "⚠️ Batch aborted during preparation"),
        Ok(BatchOutcome::Deferred) => context_info!(context_id, "♻️ Batch deferred by reload"),
        Err(e) => logging::log_error(context_id, "Batch task", &e),
    }
}
