//! Worker state management
//!
//! [`WorkerState`] belongs to one batch and is rebuilt when the next batch
//! starts. [`BrowserState`] lives as long as the context itself.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use shared::{CancelReason, ContextId, WorkerConfig};

use crate::config::ContextLocation;
use crate::core::{CommandManager, ModuleMocker, RpcBridge, VersionRegistry};
use crate::traits::{PageCleanup, TestRunner};

/// Preparation timer, a start instant until preparation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareTiming {
    Started(Instant),
    Elapsed(Duration),
}

impl PrepareTiming {
    /// Turn the start instant into the elapsed time, idempotent
    pub fn finish(&mut self) -> Duration {
        match *self {
            PrepareTiming::Started(started) => {
                let elapsed = started.elapsed();
                *self = PrepareTiming::Elapsed(elapsed);
                elapsed
            }
            PrepareTiming::Elapsed(elapsed) => elapsed,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            PrepareTiming::Elapsed(elapsed) => Some(*elapsed),
            PrepareTiming::Started(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Durations {
    pub prepare: PrepareTiming,
}

/// Mutable record of the batch in flight
pub struct WorkerState {
    pub files: Vec<String>,
    /// File currently being run or collected
    pub filepath: Option<String>,
    pub on_cancel: watch::Receiver<Option<CancelReason>>,
    pub rpc: Option<RpcBridge>,
    pub durations: Durations,
    pub environment_teardown_run: bool,
    cancel_tx: watch::Sender<Option<CancelReason>>,
    cancel_forwarder: Option<JoinHandle<()>>,
}

impl WorkerState {
    /// Fresh state for a batch, starts the preparation timer
    pub fn for_batch(files: &[String]) -> Self {
        let (cancel_tx, on_cancel) = watch::channel(None);
        Self {
            files: files.to_vec(),
            filepath: None,
            on_cancel,
            rpc: None,
            durations: Durations {
                prepare: PrepareTiming::Started(Instant::now()),
            },
            environment_teardown_run: false,
            cancel_tx,
            cancel_forwarder: None,
        }
    }

    /// Resolve the cancellation signal, only the first reason is kept
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.cancel_tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn cancelled(&self) -> Option<CancelReason> {
        *self.cancel_tx.borrow()
    }

    pub(crate) fn set_cancel_forwarder(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.cancel_forwarder.replace(handle) {
            previous.abort();
        }
    }

    pub(crate) fn stop_cancel_forwarder(&mut self) {
        if let Some(handle) = self.cancel_forwarder.take() {
            handle.abort();
        }
    }

    pub fn snapshot(&self) -> WorkerStateSnapshot {
        WorkerStateSnapshot {
            files: self.files.clone(),
            filepath: self.filepath.clone(),
            prepare_duration: self.durations.prepare.elapsed(),
            environment_teardown_run: self.environment_teardown_run,
            cancelled: self.cancelled(),
        }
    }
}

impl Drop for WorkerState {
    fn drop(&mut self) {
        self.stop_cancel_forwarder();
    }
}

/// Read-only copy of [`WorkerState`] for callers outside the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStateSnapshot {
    pub files: Vec<String>,
    pub filepath: Option<String>,
    pub prepare_duration: Option<Duration>,
    pub environment_teardown_run: bool,
    pub cancelled: Option<CancelReason>,
}

/// Context-scoped state, survives across batches
pub struct BrowserState {
    pub context_id: ContextId,
    pub location: ContextLocation,
    pub config: Arc<WorkerConfig>,
    pub commands: Option<Arc<CommandManager>>,
    pub runner: Option<Arc<dyn TestRunner>>,
    pub mocker: Option<Arc<ModuleMocker>>,
    /// Component cleanup hook registered by the page, if any
    pub page: Option<Arc<dyn PageCleanup>>,
    pub versions: VersionRegistry,
}

impl BrowserState {
    pub fn new(location: ContextLocation, config: Arc<WorkerConfig>) -> Self {
        Self {
            context_id: location.context_id.clone(),
            location,
            config,
            commands: None,
            runner: None,
            mocker: None,
            page: None,
            versions: VersionRegistry::new(),
        }
    }
}
