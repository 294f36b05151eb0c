//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one isolated execution context
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id, used when the host did not assign one
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the worker does with each file of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Execute the tests
    Run,
    /// Discover the tests without executing them
    Collect,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Run => write!(f, "run"),
            ExecutionMode::Collect => write!(f, "collect"),
        }
    }
}

/// Why the host asked the current batch to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancelReason {
    KeyboardInput,
    TestFailure,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::KeyboardInput => write!(f, "keyboard-input"),
            CancelReason::TestFailure => write!(f, "test-failure"),
        }
    }
}

/// Context the automation driver sends simulated input to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextTarget {
    /// The isolated frame where the tests run
    Iframe,
    /// The host page that owns the frame
    Parent,
}

impl fmt::Display for ContextTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextTarget::Iframe => write!(f, "iframe"),
            ContextTarget::Parent => write!(f, "parent"),
        }
    }
}

/// Automation driver backing user-input commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutomationProvider {
    /// Talks to the page over a remote protocol, no context switch needed
    #[default]
    Playwright,
    /// Keeps a single active browsing context that has to be switched
    Webdriverio,
    /// Synthetic events dispatched inside the page
    Preview,
}

impl AutomationProvider {
    /// Whether simulated input must first move the driver into the isolated frame
    pub fn requires_context_switch(&self) -> bool {
        matches!(self, AutomationProvider::Webdriverio)
    }
}

impl fmt::Display for AutomationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationProvider::Playwright => write!(f, "playwright"),
            AutomationProvider::Webdriverio => write!(f, "webdriverio"),
            AutomationProvider::Preview => write!(f, "preview"),
        }
    }
}

impl std::str::FromStr for AutomationProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "playwright" => Ok(AutomationProvider::Playwright),
            "webdriverio" | "wdio" => Ok(AutomationProvider::Webdriverio),
            "preview" => Ok(AutomationProvider::Preview),
            _ => Err(format!("Unknown automation provider: {s}")),
        }
    }
}
