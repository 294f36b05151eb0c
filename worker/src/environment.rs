//! Environment preparation for a batch
//!
//! Builds everything a batch needs before the first file runs: the RPC
//! handle, the command manager, the module mocker, side-effect interception
//! and the runner itself. Errors are returned uncaught; the orchestrator
//! decides how to report them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use shared::{context_debug, WorkerConfig};

use crate::core::{CommandManager, ModuleMocker, RpcBridge};
use crate::error::WorkerResult;
use crate::state::{BrowserState, WorkerState};
use crate::traits::{
    HostChannel, ModuleInterceptor, RunnerContext, RunnerFactory, SideEffectSpy, SpyFactory, TestRunner,
};

/// Everything the orchestrator needs from a successful preparation
#[derive(Clone)]
pub struct PreparedRun {
    pub runner: Arc<dyn TestRunner>,
    pub config: Arc<WorkerConfig>,
    pub rpc: RpcBridge,
    pub commands: Arc<CommandManager>,
}

/// Result of [`EnvironmentPreparer::prepare`]
pub enum Preparation {
    Prepared(PreparedRun),
    /// A reload was requested, the batch must be abandoned silently
    Reloading,
}

impl Preparation {
    pub fn is_reloading(&self) -> bool {
        matches!(self, Preparation::Reloading)
    }
}

/// Collaborators needed to prepare a batch
pub struct EnvironmentPreparer {
    channel: Arc<dyn HostChannel>,
    runner_factory: Arc<dyn RunnerFactory>,
    interceptor: Arc<dyn ModuleInterceptor>,
    spies: Arc<dyn SpyFactory>,
    side_effects: Arc<dyn SideEffectSpy>,
}

impl EnvironmentPreparer {
    pub fn new(
        channel: Arc<dyn HostChannel>,
        runner_factory: Arc<dyn RunnerFactory>,
        interceptor: Arc<dyn ModuleInterceptor>,
        spies: Arc<dyn SpyFactory>,
        side_effects: Arc<dyn SideEffectSpy>,
    ) -> Self {
        Self {
            channel,
            runner_factory,
            interceptor,
            spies,
            side_effects,
        }
    }

    pub async fn prepare(
        &self,
        files: &[String],
        worker_state: &Mutex<WorkerState>,
        browser: &Mutex<BrowserState>,
        reloading: &AtomicBool,
    ) -> WorkerResult<Preparation> {
        let (context_id, config, reload_start) = {
            let browser = browser.lock().await;
            (browser.context_id.clone(), browser.config.clone(), browser.location.reload_start)
        };

        context_debug!(context_id, "🔍 Trying to resolve runner (reload start {:?})", reload_start);

        if reloading.load(Ordering::SeqCst) {
            return Ok(Preparation::Reloading);
        }

        let rpc = RpcBridge::new(self.channel.clone(), context_id.clone());
        worker_state.lock().await.rpc = Some(rpc.clone());

        let commands = Arc::new(CommandManager::new(rpc.clone()));
        let mocker = Arc::new(ModuleMocker::new(
            self.interceptor.clone(),
            rpc.clone(),
            self.spies.clone(),
            config.root.clone(),
        ));
        {
            let mut browser = browser.lock().await;
            browser.commands = Some(commands.clone());
            browser.mocker = Some(mocker.clone());
        }

        self.side_effects.setup_console()?;
        self.side_effects.setup_dialogs()?;

        let runner = self
            .runner_factory
            .create_runner(RunnerContext {
                files: files.to_vec(),
                config: config.clone(),
                mocker,
                commands: commands.clone(),
                rpc: rpc.clone(),
            })
            .await?;

        {
            let mut browser = browser.lock().await;
            browser.runner = Some(runner.clone());
            let version = browser.location.version.clone();
            for file in files {
                if browser.versions.observe(file, &version) {
                    context_debug!(context_id, "🏷️ {} is now at version '{}'", file, version);
                }
            }
        }

        let mut state = worker_state.lock().await;
        let mut on_cancel = state.on_cancel.clone();
        let cancel_runner = runner.clone();
        let cancel_context = context_id.clone();
        state.set_cancel_forwarder(tokio::spawn(async move {
            while on_cancel.changed().await.is_ok() {
                let reason = *on_cancel.borrow_and_update();
                if let Some(reason) = reason {
                    context_debug!(cancel_context, "⏹️ Forwarding cancel ({:?}) to runner", reason);
                    cancel_runner.on_cancel(reason);
                    break;
                }
            }
        }));
        drop(state);

        Ok(Preparation::Prepared(PreparedRun {
            runner,
            config,
            rpc,
            commands,
        }))
    }
}
