//! Coverage bracketing for one batch

use std::sync::Arc;

use shared::{CoverageSettings, WorkerConfig};

use crate::error::WorkerResult;
use crate::traits::CoverageProvider;

/// Starts and stops instrumentation around a batch
///
/// Both ends are no-ops when coverage is disabled or no provider is installed.
pub struct CoverageLifecycle {
    provider: Option<Arc<dyn CoverageProvider>>,
    settings: CoverageSettings,
    isolate: bool,
}

impl CoverageLifecycle {
    pub fn new(provider: Option<Arc<dyn CoverageProvider>>, config: &WorkerConfig) -> Self {
        Self {
            provider,
            settings: config.coverage.clone(),
            isolate: config.browser.isolate,
        }
    }

    fn active_provider(&self) -> Option<&Arc<dyn CoverageProvider>> {
        if self.settings.enabled {
            self.provider.as_ref()
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_provider().is_some()
    }

    pub async fn start(&self) -> WorkerResult<()> {
        match self.active_provider() {
            Some(provider) => provider.start_coverage(&self.settings, self.isolate).await,
            None => Ok(()),
        }
    }

    pub async fn stop(&self) -> WorkerResult<()> {
        match self.active_provider() {
            Some(provider) => provider.stop_coverage(&self.settings, self.isolate).await,
            None => Ok(()),
        }
    }
}
