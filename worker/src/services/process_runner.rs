//! Test runner that executes each file with an external command
//!
//! The command is `<program> <args..> [--collect] <file>`. Its exit status is
//! logged but not treated as a worker failure; the command reports test
//! results to the host itself.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use shared::{context_debug, context_info, context_warn, CancelReason, ContextId};

use super::process_env::ProcessEnvironment;
use crate::core::ModuleMocker;
use crate::error::{WorkerError, WorkerResult};
use crate::traits::{RunnerContext, RunnerFactory, TestRunner};

/// Flag appended in collect mode
pub const COLLECT_FLAG: &str = "--collect";

/// Builds a [`ProcessTestRunner`] per batch
pub struct ProcessRunnerFactory {
    program: String,
    args: Vec<String>,
    environment: Arc<ProcessEnvironment>,
}

impl ProcessRunnerFactory {
    pub fn new(program: impl Into<String>, args: Vec<String>, environment: Arc<ProcessEnvironment>) -> Self {
        Self {
            program: program.into(),
            args,
            environment,
        }
    }
}

#[async_trait]
impl RunnerFactory for ProcessRunnerFactory {
    async fn create_runner(&self, context: RunnerContext) -> WorkerResult<Arc<dyn TestRunner>> {
        if self.program.trim().is_empty() {
            return Err(WorkerError::config("runner"));
        }
        self.environment.track_inputs(context.commands.clone()).await?;
        context_debug!(
            context.rpc.context_id(),
            "🧪 Runner '{}' ready for {} file(s)",
            self.program,
            context.files.len()
        );
        Ok(Arc::new(ProcessTestRunner {
            program: self.program.clone(),
            args: self.args.clone(),
            environment: self.environment.clone(),
            mocker: context.mocker,
            context_id: context.rpc.context_id().clone(),
            cancelled: AtomicBool::new(false),
        }))
    }
}

pub struct ProcessTestRunner {
    program: String,
    args: Vec<String>,
    environment: Arc<ProcessEnvironment>,
    mocker: Arc<ModuleMocker>,
    context_id: ContextId,
    cancelled: AtomicBool,
}

impl ProcessTestRunner {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn execute(&self, file: &str, collect: bool) -> WorkerResult<()> {
        if self.is_cancelled() {
            context_info!(self.context_id, "⏭️ Skipping {} after cancel", file);
            return Ok(());
        }

        self.mocker.prepare().await?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if collect {
            cmd.arg(COLLECT_FLAG);
        }
        cmd.arg(file)
            .envs(self.environment.command_env()?)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if self.environment.captures_console() {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let mut child = cmd.spawn()?;
        let mut forwarders = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(tokio::spawn(forward_lines(stdout, self.context_id.clone(), file.to_string())));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(tokio::spawn(forward_lines(stderr, self.context_id.clone(), file.to_string())));
        }

        let status = child.wait().await?;
        for forwarder in forwarders {
            let _ = forwarder.await;
        }

        if status.success() {
            context_debug!(self.context_id, "✅ {} finished", file);
        } else {
            context_warn!(self.context_id, "⚠️ {} exited with {}", file, status);
        }
        Ok(())
    }
}

async fn forward_lines<R>(stream: R, context_id: ContextId, file: String)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        context_info!(context_id, "📜 [{}] {}", file, line);
    }
}

#[async_trait]
impl TestRunner for ProcessTestRunner {
    async fn run_file(&self, file: &str) -> WorkerResult<()> {
        self.execute(file, false).await
    }

    async fn collect_file(&self, file: &str) -> WorkerResult<()> {
        self.execute(file, true).await
    }

    fn on_cancel(&self, reason: CancelReason) {
        context_info!(self.context_id, "⏹️ Runner cancelled ({:?})", reason);
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
