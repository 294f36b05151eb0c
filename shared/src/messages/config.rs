//! Configuration types
//!
//! Static configuration the host hands to every isolated context.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::{SharedError, SharedResult};
use crate::types::AutomationProvider;

/// Worker configuration for one project
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerConfig {
    /// Project root, used to key module mocks
    pub root: PathBuf,
    pub env: HashMap<String, String>,
    pub coverage: CoverageSettings,
    pub browser: BrowserSettings,
}

/// Coverage instrumentation settings
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CoverageSettings {
    pub enabled: bool,
    pub provider: Option<String>,
    pub reports_directory: Option<PathBuf>,
    pub clean: bool,
}

/// Settings for the browser side of the run
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserSettings {
    /// Run every test file in its own context
    pub isolate: bool,
    pub provider: AutomationProvider,
    pub name: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            isolate: true,
            provider: AutomationProvider::default(),
            name: "chromium".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Environment flag that mirrors debug lines to the host
    pub const DEBUG_FLAG: &'static str = "BROWSER_TESTER_DEBUG";

    pub fn from_json(raw: &str) -> SharedResult<Self> {
        let config: WorkerConfig = serde_json::from_str(raw).map_err(|e| SharedError::DeserializationError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SharedResult<()> {
        if self.coverage.enabled && self.coverage.provider.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(SharedError::InvalidConfig {
                field: "coverage.provider".to_string(),
                value: String::new(),
            });
        }
        Ok(())
    }

    /// Debug mirroring is on when the flag is set to anything but "" or "false"
    pub fn debug_enabled(&self) -> bool {
        match self.env.get(Self::DEBUG_FLAG) {
            Some(value) => !value.is_empty() && value != "false",
            None => false,
        }
    }
}
