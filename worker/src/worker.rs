//! Batch execution inside one isolated context
//!
//! [`BrowserWorker`] sequences a batch: prepare, execute every file in order,
//! clean up and tell the host the batch is done. Every failure is isolated to
//! the phase it happened in, so the host always receives exactly one `done`
//! for a batch unless a reload abandoned it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use shared::{
    context_debug, context_error, context_info, context_warn, CancelReason, ContextId, ErrorPhase, ExecutionMode,
    HostMessage, WorkerConfig,
};

use crate::config::ContextLocation;
use crate::core::{CommandManager, ContextSwitcher, CoverageLifecycle, ModuleMocker, RpcBridge, VersionEntry};
use crate::environment::{EnvironmentPreparer, Preparation, PreparedRun};
use crate::error::{WorkerError, WorkerResult};
use crate::state::{BrowserState, WorkerState, WorkerStateSnapshot};
use crate::traits::{
    CoverageProvider, EnvironmentSetup, HostChannel, ModuleInterceptor, PageCleanup, RunnerFactory, SideEffectSpy,
    SpyFactory, UserEventCleanup,
};

/// External collaborators of a [`BrowserWorker`]
#[derive(Clone)]
pub struct WorkerServices {
    pub channel: Arc<dyn HostChannel>,
    pub runner_factory: Arc<dyn RunnerFactory>,
    pub coverage: Option<Arc<dyn CoverageProvider>>,
    pub interceptor: Arc<dyn ModuleInterceptor>,
    pub spies: Arc<dyn SpyFactory>,
    pub side_effects: Arc<dyn SideEffectSpy>,
    pub environment: Arc<dyn EnvironmentSetup>,
    pub user_event: Arc<dyn UserEventCleanup>,
}

/// How a batch ended; failures have already been reported or logged
#[derive(Debug)]
pub enum BatchOutcome {
    Completed,
    /// Setup or a file failed, cleanup and `done` still ran
    Failed { error: WorkerError },
    PreloadFailed,
    /// Abandoned for a reload, no `done` was sent
    Deferred,
}

impl BatchOutcome {
    pub fn sent_done(&self) -> bool {
        !matches!(self, BatchOutcome::Deferred)
    }
}

/// Orchestrator for every batch run in one isolated context
pub struct BrowserWorker {
    context_id: ContextId,
    config: Arc<WorkerConfig>,
    channel: Arc<dyn HostChannel>,
    environment: Arc<dyn EnvironmentSetup>,
    user_event: Arc<dyn UserEventCleanup>,
    coverage: CoverageLifecycle,
    preparer: EnvironmentPreparer,
    rpc: RpcBridge,
    browser: Mutex<BrowserState>,
    worker_state: Mutex<WorkerState>,
    reloading: AtomicBool,
}

impl BrowserWorker {
    pub fn new(location: ContextLocation, config: WorkerConfig, services: WorkerServices) -> Self {
        let context_id = location.context_id.clone();
        let config = Arc::new(config);

        if let Some(elapsed) = location.since_reload(chrono::Utc::now().timestamp_millis()) {
            context_info!(context_id, "♻️ Context reloaded in {}ms", elapsed);
        }

        Self {
            coverage: CoverageLifecycle::new(services.coverage.clone(), &config),
            preparer: EnvironmentPreparer::new(
                services.channel.clone(),
                services.runner_factory,
                services.interceptor,
                services.spies,
                services.side_effects,
            ),
            rpc: RpcBridge::new(services.channel.clone(), context_id.clone()),
            channel: services.channel,
            environment: services.environment,
            user_event: services.user_event,
            browser: Mutex::new(BrowserState::new(location, config.clone())),
            worker_state: Mutex::new(WorkerState::for_batch(&[])),
            reloading: AtomicBool::new(false),
            context_id,
            config,
        }
    }

    pub fn context_id(&self) -> &ContextId {
        &self.context_id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub async fn run_tests(&self, files: Vec<String>) -> BatchOutcome {
        self.execute(ExecutionMode::Run, files).await
    }

    pub async fn collect_tests(&self, files: Vec<String>) -> BatchOutcome {
        self.execute(ExecutionMode::Collect, files).await
    }

    /// Run one batch end to end, never fails
    pub async fn execute(&self, mode: ExecutionMode, files: Vec<String>) -> BatchOutcome {
        *self.worker_state.lock().await = WorkerState::for_batch(&files);

        self.channel.wait_for_connection().await;
        self.debug(format!("📦 {:?} batch of {} file(s)", mode, files.len())).await;

        let prepared = match self
            .preparer
            .prepare(&files, &self.worker_state, &self.browser, &self.reloading)
            .await
        {
            Ok(Preparation::Prepared(prepared)) => prepared,
            Ok(Preparation::Reloading) => {
                self.debug("♻️ Reload in progress, batch deferred").await;
                return BatchOutcome::Deferred;
            }
            Err(error) => {
                context_error!(self.context_id, "❌ Preparation failed: {}", error);
                self.rpc.report(&error, ErrorPhase::Preload).await;
                self.notify_done(&files).await;
                return BatchOutcome::PreloadFailed;
            }
        };

        let prepare_time = self.worker_state.lock().await.durations.prepare.finish();
        self.debug(format!("⏱️ Prepare time {}ms", prepare_time.as_millis())).await;

        let switcher = if prepared.config.browser.provider.requires_context_switch() {
            let switcher = Arc::new(ContextSwitcher::new(prepared.rpc.clone()));
            prepared.commands.on_command(switcher.command_hook()).await;
            Some(switcher)
        } else {
            None
        };

        let result = self.run_files(mode, &files, &prepared).await;
        if let Err(error) = &result {
            context_error!(self.context_id, "❌ Batch execution failed: {}", error);
        }

        if let Err(error) = self.cleanup(switcher.as_deref()).await {
            self.rpc.report(&error, ErrorPhase::Cleanup).await;
        }

        self.worker_state.lock().await.environment_teardown_run = true;

        if let Err(error) = self.coverage.stop().await {
            self.rpc.report(&error, ErrorPhase::Coverage).await;
        }

        self.debug("🏁 Finished running tests").await;
        self.notify_done(&files).await;
        self.worker_state.lock().await.stop_cancel_forwarder();

        match result {
            Ok(()) => BatchOutcome::Completed,
            Err(error) => BatchOutcome::Failed { error },
        }
    }

    async fn run_files(&self, mode: ExecutionMode, files: &[String], prepared: &PreparedRun) -> WorkerResult<()> {
        tokio::try_join!(
            self.environment.setup_common_env(&prepared.config),
            self.coverage.start(),
            self.environment.expose_namespace(),
        )?;

        for file in files {
            self.worker_state.lock().await.filepath = Some(file.clone());
            match mode {
                ExecutionMode::Run => prepared.runner.run_file(file).await?,
                ExecutionMode::Collect => prepared.runner.collect_file(file).await?,
            }
        }
        Ok(())
    }

    /// Every teardown step runs even after an earlier one failed; the first
    /// error is the one returned
    async fn cleanup(&self, switcher: Option<&ContextSwitcher>) -> WorkerResult<()> {
        let mut first_error = None;

        let page = self.browser.lock().await.page.clone();
        if let Some(page) = page {
            if let Err(error) = page.cleanup() {
                context_warn!(self.context_id, "⚠️ Page cleanup failed: {}", error);
                first_error.get_or_insert(error);
            }
        }

        if let Err(error) = self.user_event.cleanup().await {
            context_warn!(self.context_id, "⚠️ User event cleanup failed: {}", error);
            first_error.get_or_insert(error);
        }

        if let Some(switcher) = switcher {
            if let Err(error) = switcher.restore().await {
                context_warn!(self.context_id, "⚠️ Switching back to the parent context failed: {}", error);
                first_error.get_or_insert(error);
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn notify_done(&self, files: &[String]) {
        let message = HostMessage::Done {
            filenames: files.to_vec(),
            id: self.context_id.clone(),
        };
        if let Err(error) = self.channel.post(message).await {
            context_warn!(self.context_id, "⚠️ Could not post done: {}", error);
        }
    }

    /// Log locally and mirror to the host when the debug flag is set
    async fn debug(&self, message: impl Into<String>) {
        let message = message.into();
        context_debug!(self.context_id, "{}", message);
        if self.config.debug_enabled() {
            let _ = self.rpc.debug(vec![message]).await;
        }
    }

    /// Signal cancellation to the batch in flight, the first reason wins
    pub async fn cancel(&self, reason: CancelReason) -> bool {
        let accepted = self.worker_state.lock().await.cancel(reason);
        if accepted {
            context_info!(self.context_id, "⏹️ Cancel requested ({:?})", reason);
        }
        accepted
    }

    /// Make the next preparation abandon its batch
    pub fn request_reload(&self) {
        self.reloading.store(true, Ordering::SeqCst);
        context_info!(self.context_id, "♻️ Reload requested");
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading.load(Ordering::SeqCst)
    }

    pub async fn register_page_cleanup(&self, page: Arc<dyn PageCleanup>) {
        self.browser.lock().await.page = Some(page);
    }

    pub async fn commands(&self) -> Option<Arc<CommandManager>> {
        self.browser.lock().await.commands.clone()
    }

    pub async fn mocker(&self) -> Option<Arc<ModuleMocker>> {
        self.browser.lock().await.mocker.clone()
    }

    pub async fn version_entry(&self, file: &str) -> Option<VersionEntry> {
        self.browser.lock().await.versions.get(file).cloned()
    }

    pub async fn worker_state(&self) -> WorkerStateSnapshot {
        self.worker_state.lock().await.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{
        MockEnvironmentSetup, MockHostChannel, MockModuleInterceptor, MockRunnerFactory, MockSideEffectSpy,
        MockSpyFactory, MockTestRunner, MockUserEventCleanup, TestRunner,
    };
    use shared::{RpcRequest, RpcResponse};

    fn services(channel: MockHostChannel, factory: MockRunnerFactory) -> WorkerServices {
        let mut side_effects = MockSideEffectSpy::new();
        side_effects.expect_setup_console().returning(|| Ok(()));
        side_effects.expect_setup_dialogs().returning(|| Ok(()));
        let mut environment = MockEnvironmentSetup::new();
        environment.expect_setup_common_env().returning(|_| Ok(()));
        environment.expect_expose_namespace().returning(|| Ok(()));
        let mut user_event = MockUserEventCleanup::new();
        user_event.expect_cleanup().returning(|| Ok(()));

        WorkerServices {
            channel: Arc::new(channel),
            runner_factory: Arc::new(factory),
            coverage: None,
            interceptor: Arc::new(MockModuleInterceptor::new()),
            spies: Arc::new(MockSpyFactory::new()),
            side_effects: Arc::new(side_effects),
            environment: Arc::new(environment),
            user_event: Arc::new(user_event),
        }
    }

    fn worker(channel: MockHostChannel, factory: MockRunnerFactory) -> BrowserWorker {
        let location = ContextLocation::parse("http://localhost/?contextId=ctx-unit&browserv=1").unwrap();
        BrowserWorker::new(location, WorkerConfig::default(), services(channel, factory))
    }

    #[tokio::test]
    async fn test_successful_batch_posts_done_once() {
        let mut channel = MockHostChannel::new();
        channel.expect_wait_for_connection().returning(|| ());
        channel.expect_is_connected().returning(|| true);
        channel
            .expect_post()
            .withf(|message| matches!(message, HostMessage::Done { filenames, .. } if filenames.len() == 1))
            .times(1)
            .returning(|_| Ok(()));

        let mut factory = MockRunnerFactory::new();
        factory.expect_create_runner().returning(|_| {
            let mut runner = MockTestRunner::new();
            runner.expect_run_file().times(1).returning(|_| Ok(()));
            Ok(Arc::new(runner) as Arc<dyn TestRunner>)
        });

        let worker = worker(channel, factory);
        let outcome = worker.run_tests(vec!["a.test".to_string()]).await;
        assert!(matches!(outcome, BatchOutcome::Completed));

        let state = worker.worker_state().await;
        assert!(state.environment_teardown_run);
        assert_eq!(state.filepath.as_deref(), Some("a.test"));
        assert!(state.prepare_duration.is_some());
    }

    #[tokio::test]
    async fn test_preload_failure_reports_and_posts_done() {
        let mut channel = MockHostChannel::new();
        channel.expect_wait_for_connection().returning(|| ());
        channel.expect_is_connected().returning(|| true);
        channel
            .expect_request()
            .withf(|request| matches!(request, RpcRequest::OnUnhandledError { error, .. } if error.name == "TypeError"))
            .times(1)
            .returning(|_| Ok(RpcResponse::Ack));
        channel.expect_post().times(1).returning(|_| Ok(()));

        let mut factory = MockRunnerFactory::new();
        factory
            .expect_create_runner()
            .returning(|_| Err(WorkerError::thrown("TypeError", "boom")));

        let worker = worker(channel, factory);
        let outcome = worker.run_tests(vec!["a.test".to_string()]).await;
        assert!(matches!(outcome, BatchOutcome::PreloadFailed));
        assert!(!worker.worker_state().await.environment_teardown_run);
    }

    #[tokio::test]
    async fn test_reload_defers_without_done() {
        let mut channel = MockHostChannel::new();
        channel.expect_wait_for_connection().returning(|| ());
        channel.expect_post().times(0);
        channel.expect_request().times(0);

        let mut factory = MockRunnerFactory::new();
        factory.expect_create_runner().times(0);

        let worker = worker(channel, factory);
        worker.request_reload();
        let outcome = worker.run_tests(vec!["a.test".to_string()]).await;
        assert!(matches!(outcome, BatchOutcome::Deferred));
        assert!(!outcome.sent_done());
    }
}
