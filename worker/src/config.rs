//! Context address and configuration loading
//!
//! The address a context was opened with carries its identity: the context
//! id, the version token of the files it serves and, after a reload, the
//! epoch the reload started at. It is parsed once at startup.
//!
//! ## Configuration Sources
//! 1. JSON file passed with `--config` (defaults when absent)
//! 2. `.env` file in the current directory or parent directories (if present)
//! 3. System environment variables prefixed with `BROWSER_TESTER_`
//!
//! Prefixed environment variables take precedence over the file's `env` map.

use std::path::Path;

use url::Url;

use shared::{context_debug, ContextId, WorkerConfig};

use crate::error::{WorkerError, WorkerResult};

/// Parsed address of the isolated context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLocation {
    pub url: Url,
    pub context_id: ContextId,
    /// Version token of the files served to this context
    pub version: String,
    /// Epoch millis the reload that produced this context started at
    pub reload_start: Option<i64>,
}

impl ContextLocation {
    pub const CONTEXT_PARAM: &'static str = "contextId";
    pub const VERSION_PARAM: &'static str = "browserv";
    pub const RELOAD_PARAM: &'static str = "reloadStart";

    pub fn parse(address: &str) -> WorkerResult<Self> {
        let url = Url::parse(address).map_err(|e| WorkerError::Location {
            message: format!("{address}: {e}"),
        })?;

        let mut context_id = None;
        let mut version = String::new();
        let mut reload_start = None;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                Self::CONTEXT_PARAM if !value.is_empty() => context_id = Some(ContextId::new(value.as_ref())),
                Self::VERSION_PARAM => version = value.into_owned(),
                Self::RELOAD_PARAM => reload_start = value.parse::<i64>().ok(),
                _ => {}
            }
        }

        Ok(Self {
            context_id: context_id.unwrap_or_else(ContextId::generate),
            url,
            version,
            reload_start,
        })
    }

    /// Whether this context was created by a reload
    pub fn is_reload(&self) -> bool {
        self.reload_start.is_some()
    }

    /// Milliseconds between the reload start and `now_ms`
    pub fn since_reload(&self, now_ms: i64) -> Option<i64> {
        self.reload_start.map(|start| now_ms.saturating_sub(start).max(0))
    }
}

/// Prefix of process variables merged into the config's env map
pub const ENV_PREFIX: &str = "BROWSER_TESTER_";

/// Load the worker configuration from an optional JSON file plus the environment
pub fn load_config(path: Option<&Path>) -> WorkerResult<WorkerConfig> {
    // Silently ignored when no .env file exists
    let _ = dotenv::dotenv();

    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            WorkerConfig::from_json(&raw)?
        }
        None => WorkerConfig::default(),
    };

    merge_prefixed_env(&mut config, std::env::vars());
    Ok(config)
}

/// Copy prefixed variables into `config.env`, overriding existing keys
pub fn merge_prefixed_env<I>(config: &mut WorkerConfig, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if key.starts_with(ENV_PREFIX) {
            config.env.insert(key, value);
        }
    }
}

/// Log where the context came from
pub fn describe(location: &ContextLocation) {
    context_debug!(
        location.context_id,
        "📍 Context address {} (version '{}', reload start {:?})",
        location.url,
        location.version,
        location.reload_start
    );
}
