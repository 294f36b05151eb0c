//! Shared logging utilities for consistent tracing across contexts

use crate::types::ContextId;
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Build the per-crate filter directive for a base level
fn filter_directive(base_level: &str) -> String {
    format!("worker={base_level},shared={base_level}")
}

/// Initialize tracing subscriber with an optional log level
pub fn init_tracing_with_level(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let base_level = log_level.unwrap_or("info");
    let env_filter = filter_directive(base_level);

    // try_init so tests and embedders that already installed a subscriber keep it
    let _ = fmt()
        .with_env_filter(EnvFilter::new(&env_filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for context-aware info logging
#[macro_export]
macro_rules! context_info {
    ($context_id:expr, $($arg:tt)*) => {
        tracing::info!(
            context = %$context_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for context-aware warning logging
#[macro_export]
macro_rules! context_warn {
    ($context_id:expr, $($arg:tt)*) => {
        tracing::warn!(
            context = %$context_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for context-aware error logging
#[macro_export]
macro_rules! context_error {
    ($context_id:expr, $($arg:tt)*) => {
        tracing::error!(
            context = %$context_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for context-aware debug logging
#[macro_export]
macro_rules! context_debug {
    ($context_id:expr, $($arg:tt)*) => {
        tracing::debug!(
            context = %$context_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(context_id: &ContextId, details: &str) {
    info!(
        context = %context_id,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(context_id: &ContextId, reason: &str) {
    info!(
        context = %context_id,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(context_id: &ContextId, context: &str, error: &dyn std::fmt::Display) {
    error!(
        context = %context_id,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(context_id: &ContextId, message: &str) {
    info!(
        context = %context_id,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}
