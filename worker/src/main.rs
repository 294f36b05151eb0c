//! Main entry point for the worker binary
//!
//! Connects to the host coordinator, then runs the batches the host sends
//! until it disconnects, asks for shutdown or the process is interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;

use shared::{context_warn, logging};
use worker::{
    config,
    services::{ProcessEnvironment, ProcessRunnerFactory, RpcMockInterceptor, TcpHostChannel},
    ContextLocation, HostSession, RpcBridge, WorkerServices,
};

/// Test worker for one isolated browser context
#[derive(Parser)]
#[command(name = "worker")]
#[command(about = "Runs test batches for a host coordinator inside one isolated context")]
pub struct Args {
    /// Host coordinator address
    #[arg(long, default_value = "127.0.0.1:7357")]
    pub host: SocketAddr,

    /// Context address, carries contextId, browserv and reloadStart
    #[arg(long)]
    pub url: String,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Program that executes a single test file
    #[arg(long, default_value = "node")]
    pub runner: String,

    /// Extra argument passed to the runner before the file (repeatable)
    #[arg(long = "runner-arg")]
    pub runner_arg: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_tracing_with_level(Some(&args.log_level));

    let location = ContextLocation::parse(&args.url).context("invalid --url")?;
    let worker_config = config::load_config(args.config.as_deref()).context("failed to load configuration")?;
    let context_id = location.context_id.clone();

    logging::log_startup(&context_id, "browser test worker");
    config::describe(&location);
    if worker_config.coverage.enabled {
        context_warn!(context_id, "⚠️ Coverage is enabled but this build has no coverage provider");
    }

    let (channel, mut commands) = TcpHostChannel::connect(args.host, context_id.clone());
    let environment = Arc::new(ProcessEnvironment::new());
    let services = WorkerServices {
        channel: channel.clone(),
        runner_factory: Arc::new(ProcessRunnerFactory::new(
            args.runner.clone(),
            args.runner_arg.clone(),
            environment.clone(),
        )),
        coverage: None,
        interceptor: Arc::new(RpcMockInterceptor::new(RpcBridge::new(channel.clone(), context_id.clone()))),
        spies: environment.clone(),
        side_effects: environment.clone(),
        environment: environment.clone(),
        user_event: environment,
    };

    let mut session = HostSession::new(location, worker_config, services);

    let reason = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    if !session.handle(command).await {
                        break "host requested shutdown";
                    }
                }
                None => break "host disconnected",
            },
            _ = signal::ctrl_c() => break "interrupted",
        }
    };

    session.drain().await;
    logging::log_shutdown(&context_id, reason);
    Ok(())
}
