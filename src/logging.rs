//! # Structured Logging Module
//!
//! Environment-aware structured logging for migration runs, plus helpers that
//! give group commits, migration steps and timed actions a consistent shape.

use chrono::Utc;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Instant;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::environments;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// `RUST_LOG` wins over the environment default when set. Setting
/// `DOCSTORE_LOG_FORMAT=json` switches the console output to JSON lines.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
        };

        let json_output = std::env::var("DOCSTORE_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let console_layer = if json_output {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .json()
                .with_filter(filter())
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter())
                .boxed()
        };

        // try_init: a host application may already own the global subscriber
        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = json_output,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("DOCSTORE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| environments::DEVELOPMENT.to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        environments::TEST => "debug",
        environments::DEVELOPMENT => "debug",
        environments::PRODUCTION => "info",
        _ => "debug",
    }
}

/// Log structured data for a group commit
pub fn log_group_operation(
    operation: &str,
    writer_id: &str,
    group_index: u64,
    size: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        writer_id = %writer_id,
        group_index = group_index,
        size = size,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📦 GROUP_OPERATION"
    );
}

/// Log structured data for a migration run step
pub fn log_migration_operation(
    operation: &str,
    tag: &str,
    run_id: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        tag = %tag,
        run_id = %run_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🚚 MIGRATION_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}

/// Await `action`, logging its start, duration and any failure under `label`
pub async fn log_action<F, T, E>(label: &str, action: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    tracing::info!(action = %label, "▶️ Starting");
    let started = Instant::now();
    let result = action.await;
    let duration_ms = started.elapsed().as_millis();

    match &result {
        Ok(_) => tracing::info!(action = %label, duration_ms = duration_ms, "✅ Finished"),
        Err(error) => tracing::error!(
            action = %label,
            duration_ms = duration_ms,
            error = %error,
            "❌ Failed"
        ),
    }
    result
}
