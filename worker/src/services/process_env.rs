//! Environment-variable backed execution environment
//!
//! Test processes spawned by the process runner inherit their environment
//! from here: the project env map, the exposed namespace marker and the
//! console/dialog interception switches. Input commands a batch sends to the
//! host are tracked so cleanup can ask the host to release them.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures_util::FutureExt;

use shared::WorkerConfig;

use crate::core::{CommandHook, CommandManager};
use crate::error::{WorkerError, WorkerResult};
use crate::traits::{EnvironmentSetup, SideEffectSpy, SpyFactory, UserEventCleanup};

/// Variable marking the namespace as exposed, carries the worker version
pub const NAMESPACE_VAR: &str = "__BROWSER_TESTER_INDEX__";
/// Variable telling child processes to stub blocking dialogs
pub const DIALOGS_VAR: &str = "BROWSER_TESTER_DIALOGS";
/// Variable listing the modules to wrap in spies
pub const SPIED_MODULES_VAR: &str = "BROWSER_TESTER_SPIED_MODULES";

/// Commands that leave keys or buttons in a state the next batch would inherit
pub const INPUT_COMMANDS: &[&str] = &[
    "click",
    "dblClick",
    "tripleClick",
    "hover",
    "type",
    "fill",
    "keyboard",
    "press",
    "dragAndDrop",
    "selectOptions",
    "tab",
];
/// Command asking the host to release every held input, payload lists the inputs
pub const RELEASE_COMMAND: &str = "releaseInputs";

/// Shared environment for every process of a batch
#[derive(Default)]
pub struct ProcessEnvironment {
    vars: RwLock<HashMap<String, String>>,
    spied: RwLock<BTreeSet<String>>,
    capture_console: AtomicBool,
    inputs: Arc<RwLock<Vec<String>>>,
    commands: RwLock<Option<Arc<CommandManager>>>,
}

impl ProcessEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables to hand to a child process
    pub fn command_env(&self) -> WorkerResult<HashMap<String, String>> {
        let mut vars = self.vars.read().map_err(|_| poisoned("vars"))?.clone();
        let spied = self.spied.read().map_err(|_| poisoned("spied"))?;
        if !spied.is_empty() {
            let modules: Vec<&str> = spied.iter().map(String::as_str).collect();
            vars.insert(SPIED_MODULES_VAR.to_string(), modules.join(","));
        }
        Ok(vars)
    }

    pub fn captures_console(&self) -> bool {
        self.capture_console.load(Ordering::SeqCst)
    }

    pub fn spied_modules(&self) -> Vec<String> {
        self.spied
            .read()
            .map(|spied| spied.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Track the input commands of the batch that owns `commands`
    pub async fn track_inputs(&self, commands: Arc<CommandManager>) -> WorkerResult<()> {
        commands.on_command(self.input_hook()).await;
        *self.commands.write().map_err(|_| poisoned("commands"))? = Some(commands);
        Ok(())
    }

    /// Input commands sent since the last cleanup
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.read().map(|inputs| inputs.clone()).unwrap_or_default()
    }

    fn input_hook(&self) -> CommandHook {
        let inputs = Arc::clone(&self.inputs);
        Arc::new(move |command: String| {
            let recorded = if INPUT_COMMANDS.contains(&command.as_str()) {
                inputs
                    .write()
                    .map(|mut inputs| inputs.push(command))
                    .map_err(|_| poisoned("inputs"))
            } else {
                Ok(())
            };
            async move { recorded }.boxed()
        })
    }

    fn set_var(&self, key: &str, value: &str) -> WorkerResult<()> {
        self.vars
            .write()
            .map_err(|_| poisoned("vars"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn poisoned(what: &str) -> WorkerError {
    WorkerError::thrown("Error", format!("{what} lock poisoned"))
}

#[async_trait]
impl EnvironmentSetup for ProcessEnvironment {
    async fn setup_common_env(&self, config: &WorkerConfig) -> WorkerResult<()> {
        let mut vars = self.vars.write().map_err(|_| poisoned("vars"))?;
        vars.extend(config.env.iter().map(|(key, value)| (key.clone(), value.clone())));
        Ok(())
    }

    async fn expose_namespace(&self) -> WorkerResult<()> {
        self.set_var(NAMESPACE_VAR, env!("CARGO_PKG_VERSION"))
    }
}

impl SideEffectSpy for ProcessEnvironment {
    fn setup_console(&self) -> WorkerResult<()> {
        self.capture_console.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn setup_dialogs(&self) -> WorkerResult<()> {
        self.set_var(DIALOGS_VAR, "stub")
    }
}

impl SpyFactory for ProcessEnvironment {
    fn spy_on_module(&self, module_id: &str) -> WorkerResult<()> {
        self.spied
            .write()
            .map_err(|_| poisoned("spied"))?
            .insert(module_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl UserEventCleanup for ProcessEnvironment {
    async fn cleanup(&self) -> WorkerResult<()> {
        let inputs = std::mem::take(&mut *self.inputs.write().map_err(|_| poisoned("inputs"))?);
        let commands = self.commands.write().map_err(|_| poisoned("commands"))?.take();

        match commands {
            Some(commands) if !inputs.is_empty() => {
                commands
                    .trigger_command(RELEASE_COMMAND, serde_json::to_string(&inputs)?)
                    .await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
