//! Test helpers and builder patterns for worker tests
//!
//! The fakes below record every observable step into one shared [`Timeline`]
//! so tests can assert on ordering across collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use shared::{
    CancelReason, ContextTarget, CoverageSettings, HostMessage, MockKind, RpcRequest, RpcResponse, TransportError,
    WorkerConfig,
};
use worker::{
    BrowserWorker, CommandManager, ContextLocation, CoverageProvider, EnvironmentSetup, HostChannel, HostSession,
    ModuleInterceptor, PageCleanup, RunnerContext, RunnerFactory, SideEffectSpy, SpyFactory, TestRunner,
    UserEventCleanup, WorkerError, WorkerResult, WorkerServices,
};

use super::fixtures::TestFixtures;

/// Ordered log of everything the fakes observed
#[derive(Clone, Default)]
pub struct Timeline(Arc<Mutex<Vec<String>>>);

impl Timeline {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|entry| entry.starts_with(prefix)).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|candidate| candidate == entry)
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }

    /// Entries that are not debug mirrors
    pub fn steps(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| !entry.starts_with("rpc:debug"))
            .collect()
    }
}

/// Host coordinator stand-in
pub struct FakeHost {
    timeline: Timeline,
    switch_delay: Duration,
    fail_reports: bool,
    requests: Mutex<Vec<RpcRequest>>,
}

impl FakeHost {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            switch_delay: Duration::ZERO,
            fail_reports: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_switch_delay(mut self, delay: Duration) -> Self {
        self.switch_delay = delay;
        self
    }

    pub fn with_failing_reports(mut self) -> Self {
        self.fail_reports = true;
        self
    }

    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn entry(request: &RpcRequest) -> String {
        match request {
            RpcRequest::WdioSwitchContext { target } => format!("rpc:wdioSwitchContext:{target}"),
            RpcRequest::OnUnhandledError { error, phase } => {
                format!("rpc:onUnhandledError:{phase}:{}", error.name)
            }
            RpcRequest::TriggerCommand { command, .. } => format!("rpc:triggerCommand:{command}"),
            other => format!("rpc:{}", other.method()),
        }
    }
}

#[async_trait]
impl HostChannel for FakeHost {
    async fn wait_for_connection(&self) {}

    fn is_connected(&self) -> bool {
        true
    }

    async fn request(&self, request: RpcRequest) -> Result<RpcResponse, TransportError> {
        let switching_in = matches!(request, RpcRequest::WdioSwitchContext { target: ContextTarget::Iframe });
        if switching_in && !self.switch_delay.is_zero() {
            tokio::time::sleep(self.switch_delay).await;
        }

        self.timeline.push(Self::entry(&request));
        let failing_report = self.fail_reports && matches!(request, RpcRequest::OnUnhandledError { .. });
        self.requests.lock().unwrap().push(request);

        if failing_report {
            return Err(TransportError::Closed);
        }
        Ok(RpcResponse::Ack)
    }

    async fn post(&self, message: HostMessage) -> Result<(), TransportError> {
        match message {
            HostMessage::Done { filenames, .. } => self.timeline.push(format!("done:{}", filenames.join(","))),
        }
        Ok(())
    }
}

/// How the recording runner behaves
#[derive(Clone, Default)]
pub struct RunnerBehavior {
    /// Fail the batch when this file runs
    pub fail_on: Option<String>,
    /// Issue this browser command from every file
    pub command: Option<String>,
    /// Park in the first file until a cancel arrives
    pub wait_for_cancel: bool,
}

pub struct RecordingRunner {
    timeline: Timeline,
    behavior: RunnerBehavior,
    commands: Arc<CommandManager>,
    cancels: Arc<Mutex<Vec<CancelReason>>>,
}

impl RecordingRunner {
    async fn step(&self, kind: &str, file: &str) -> WorkerResult<()> {
        self.timeline.push(format!("{kind}:{file}"));

        if self.behavior.wait_for_cancel {
            for _ in 0..200 {
                if !self.cancels.lock().unwrap().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }

        if let Some(command) = &self.behavior.command {
            self.commands.trigger_command(command, String::new()).await?;
        }

        if self.behavior.fail_on.as_deref() == Some(file) {
            return Err(WorkerError::thrown("AssertionError", format!("{file} blew up")));
        }
        Ok(())
    }
}

#[async_trait]
impl TestRunner for RecordingRunner {
    async fn run_file(&self, file: &str) -> WorkerResult<()> {
        self.step("run", file).await
    }

    async fn collect_file(&self, file: &str) -> WorkerResult<()> {
        self.step("collect", file).await
    }

    fn on_cancel(&self, reason: CancelReason) {
        self.timeline.push(format!("cancel:{reason:?}"));
        self.cancels.lock().unwrap().push(reason);
    }
}

pub struct FixedRunnerFactory {
    timeline: Timeline,
    behavior: RunnerBehavior,
    create_error: Option<(String, String)>,
    cancels: Arc<Mutex<Vec<CancelReason>>>,
}

#[async_trait]
impl RunnerFactory for FixedRunnerFactory {
    async fn create_runner(&self, context: RunnerContext) -> WorkerResult<Arc<dyn TestRunner>> {
        if let Some((name, message)) = &self.create_error {
            return Err(WorkerError::thrown(name.clone(), message.clone()));
        }
        self.timeline.push("runner:created");
        Ok(Arc::new(RecordingRunner {
            timeline: self.timeline.clone(),
            behavior: self.behavior.clone(),
            commands: context.commands,
            cancels: self.cancels.clone(),
        }))
    }
}

pub struct RecordingCoverage {
    timeline: Timeline,
    fail_stop: bool,
}

#[async_trait]
impl CoverageProvider for RecordingCoverage {
    async fn start_coverage(&self, _settings: &CoverageSettings, _isolate: bool) -> WorkerResult<()> {
        self.timeline.push("coverage:start");
        Ok(())
    }

    async fn stop_coverage(&self, _settings: &CoverageSettings, _isolate: bool) -> WorkerResult<()> {
        self.timeline.push("coverage:stop");
        if self.fail_stop {
            return Err(WorkerError::thrown("Error", "coverage flush failed"));
        }
        Ok(())
    }
}

/// Which in-page collaborators fail
#[derive(Clone, Copy, Default)]
pub struct EnvironmentFailures {
    pub setup: bool,
    pub user_event: bool,
    pub page: bool,
}

/// Records every in-page side effect the worker asks for
pub struct RecordingEnvironment {
    timeline: Timeline,
    failures: EnvironmentFailures,
}

impl RecordingEnvironment {
    pub fn new(timeline: Timeline, failures: EnvironmentFailures) -> Self {
        Self { timeline, failures }
    }
}

#[async_trait]
impl EnvironmentSetup for RecordingEnvironment {
    async fn setup_common_env(&self, _config: &WorkerConfig) -> WorkerResult<()> {
        self.timeline.push("env:setup");
        if self.failures.setup {
            return Err(WorkerError::thrown("ReferenceError", "process is not defined"));
        }
        Ok(())
    }

    async fn expose_namespace(&self) -> WorkerResult<()> {
        self.timeline.push("env:namespace");
        Ok(())
    }
}

impl SideEffectSpy for RecordingEnvironment {
    fn setup_console(&self) -> WorkerResult<()> {
        self.timeline.push("spy:console");
        Ok(())
    }

    fn setup_dialogs(&self) -> WorkerResult<()> {
        self.timeline.push("spy:dialogs");
        Ok(())
    }
}

impl SpyFactory for RecordingEnvironment {
    fn spy_on_module(&self, module_id: &str) -> WorkerResult<()> {
        self.timeline.push(format!("spy:module:{module_id}"));
        Ok(())
    }
}

#[async_trait]
impl ModuleInterceptor for RecordingEnvironment {
    async fn register(&self, id: &str, kind: MockKind) -> WorkerResult<()> {
        self.timeline.push(format!("mock:register:{id}:{kind:?}"));
        Ok(())
    }

    async fn delete(&self, id: &str) -> WorkerResult<()> {
        self.timeline.push(format!("mock:delete:{id}"));
        Ok(())
    }

    async fn invalidate(&self) -> WorkerResult<()> {
        self.timeline.push("mock:invalidate");
        Ok(())
    }
}

#[async_trait]
impl UserEventCleanup for RecordingEnvironment {
    async fn cleanup(&self) -> WorkerResult<()> {
        self.timeline.push("cleanup:user-event");
        if self.failures.user_event {
            return Err(WorkerError::thrown("Error", "keyboard still pressed"));
        }
        Ok(())
    }
}

impl PageCleanup for RecordingEnvironment {
    fn cleanup(&self) -> WorkerResult<()> {
        self.timeline.push("cleanup:page");
        if self.failures.page {
            return Err(WorkerError::thrown("Error", "unmount failed"));
        }
        Ok(())
    }
}

/// Worker under test plus the handles tests assert on
pub struct TestWorker {
    pub worker: Arc<BrowserWorker>,
    pub timeline: Timeline,
    pub host: Arc<FakeHost>,
    pub cancels: Arc<Mutex<Vec<CancelReason>>>,
}

impl TestWorker {
    pub fn cancels(&self) -> Vec<CancelReason> {
        self.cancels.lock().unwrap().clone()
    }
}

/// Command dispatcher under test
pub struct TestSession {
    pub session: HostSession,
    pub timeline: Timeline,
    pub cancels: Arc<Mutex<Vec<CancelReason>>>,
}

impl TestSession {
    /// Poll the timeline until `entry` shows up
    pub async fn wait_for(&self, entry: &str) {
        for _ in 0..200 {
            if self.timeline.contains(entry) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("'{entry}' never appeared in {:?}", self.timeline.entries());
    }
}

/// Builder pattern for creating test workers with sensible defaults
pub struct WorkerBuilder {
    address: String,
    config: WorkerConfig,
    switch_delay: Duration,
    failing_reports: bool,
    runner: RunnerBehavior,
    create_error: Option<(String, String)>,
    coverage: Option<bool>,
    failures: EnvironmentFailures,
}

impl WorkerBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        let mut config = WorkerConfig::default();
        config.root = TestFixtures::PROJECT_ROOT.into();
        Self {
            address: TestFixtures::ADDRESS.to_string(),
            config,
            switch_delay: Duration::ZERO,
            failing_reports: false,
            runner: RunnerBehavior::default(),
            create_error: None,
            coverage: None,
            failures: EnvironmentFailures::default(),
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    /// Configure the worker configuration with a setup function
    pub fn with_config<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut WorkerConfig),
    {
        setup(&mut self.config);
        self
    }

    /// Configure the runner with a setup function
    pub fn with_runner<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut RunnerBehavior),
    {
        setup(&mut self.runner);
        self
    }

    /// Configure which in-page collaborators fail
    pub fn with_failures<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut EnvironmentFailures),
    {
        setup(&mut self.failures);
        self
    }

    /// Make runner construction throw
    pub fn with_failing_runner(mut self, name: &str, message: &str) -> Self {
        self.create_error = Some((name.to_string(), message.to_string()));
        self
    }

    /// Enable coverage with a recording provider
    pub fn with_coverage(mut self, fail_stop: bool) -> Self {
        self.config.coverage.enabled = true;
        self.coverage = Some(fail_stop);
        self
    }

    pub fn with_switch_delay(mut self, delay: Duration) -> Self {
        self.switch_delay = delay;
        self
    }

    pub fn with_failing_reports(mut self) -> Self {
        self.failing_reports = true;
        self
    }

    /// Build the worker with all configured fakes
    pub fn build(self) -> TestWorker {
        let (location, config, services, parts) = self.assemble();
        TestWorker {
            worker: Arc::new(BrowserWorker::new(location, config, services)),
            timeline: parts.timeline,
            host: parts.host,
            cancels: parts.cancels,
        }
    }

    /// Build a command dispatcher around the configured fakes
    pub fn build_session(self) -> TestSession {
        let (location, config, services, parts) = self.assemble();
        TestSession {
            session: HostSession::new(location, config, services),
            timeline: parts.timeline,
            cancels: parts.cancels,
        }
    }

    fn assemble(self) -> (ContextLocation, WorkerConfig, WorkerServices, Parts) {
        let timeline = Timeline::default();
        let cancels = Arc::new(Mutex::new(Vec::new()));

        let mut host = FakeHost::new(timeline.clone()).with_switch_delay(self.switch_delay);
        if self.failing_reports {
            host = host.with_failing_reports();
        }
        let host = Arc::new(host);

        let environment = Arc::new(RecordingEnvironment::new(timeline.clone(), self.failures));
        let coverage = self.coverage.map(|fail_stop| {
            Arc::new(RecordingCoverage {
                timeline: timeline.clone(),
                fail_stop,
            }) as Arc<dyn CoverageProvider>
        });

        let services = WorkerServices {
            channel: host.clone(),
            runner_factory: Arc::new(FixedRunnerFactory {
                timeline: timeline.clone(),
                behavior: self.runner,
                create_error: self.create_error,
                cancels: cancels.clone(),
            }),
            coverage,
            interceptor: environment.clone(),
            spies: environment.clone(),
            side_effects: environment.clone(),
            environment: environment.clone(),
            user_event: environment,
        };

        let location = ContextLocation::parse(&self.address).unwrap();
        (location, self.config, services, Parts { timeline, host, cancels })
    }
}

struct Parts {
    timeline: Timeline,
    host: Arc<FakeHost>,
    cancels: Arc<Mutex<Vec<CancelReason>>>,
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Worker with every collaborator succeeding
    pub fn simple_worker() -> TestWorker {
        WorkerBuilder::new().build()
    }

    /// Worker whose driver needs an explicit context switch
    pub fn webdriverio_worker(command: &str) -> TestWorker {
        WorkerBuilder::new()
            .with_config(|config| config.browser.provider = shared::AutomationProvider::Webdriverio)
            .with_runner(|runner| runner.command = Some(command.to_string()))
            .build()
    }

    /// Page cleanup hook that records into the worker's timeline
    pub fn page_cleanup(test: &TestWorker, fail: bool) -> Arc<dyn PageCleanup> {
        Arc::new(RecordingEnvironment::new(
            test.timeline.clone(),
            EnvironmentFailures {
                page: fail,
                ..EnvironmentFailures::default()
            },
        ))
    }

    /// Assert the timeline contains `expected` in this relative order
    pub fn assert_in_order(timeline: &Timeline, expected: &[&str]) {
        let entries = timeline.entries();
        let mut last = None;
        for step in expected {
            let position = entries
                .iter()
                .position(|entry| entry == step)
                .unwrap_or_else(|| panic!("missing '{step}' in {entries:?}"));
            if let Some(previous) = last {
                assert!(position > previous, "'{step}' out of order in {entries:?}");
            }
            last = Some(position);
        }
    }
}
