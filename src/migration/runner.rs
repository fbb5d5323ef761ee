//! # Migration Runner
//!
//! Drives one migration run end to end:
//!
//! ```text
//! lookup tag -> confirmation gate (production only) -> build writer
//!     -> task.run() -> writer.close() -> counter.print() -> RunSummary
//! ```
//!
//! The writer is closed and the counter printed whether or not the task
//! succeeds, so pending operations are never silently dropped and every run
//! ends with a read/write/failure summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::gate::{AutoConfirm, ConfirmationGate};
use super::registry::MigrationRegistry;
use crate::config::{BatchWriterConfig, WriteMode};
use crate::constants::system;
use crate::error::{BatchError, Result};
use crate::logging::{log_action, log_error, log_migration_operation};
use crate::metrics::{CounterSnapshot, ProgressCounter};
use crate::store::DocumentStore;
use crate::writer::{BoundedBatchWriter, WriteResultHandler};

/// Record of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Crate version that produced the run
    pub version: String,
    pub tag: String,
    pub mode: WriteMode,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub groups_committed: u64,
    pub dry_run_skipped: u64,
    pub counts: CounterSnapshot,
}

impl RunSummary {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Runs registered migrations against one store
pub struct MigrationRunner {
    registry: Arc<MigrationRegistry>,
    store: Arc<dyn DocumentStore>,
    config: BatchWriterConfig,
    gate: Arc<dyn ConfirmationGate>,
    result_handler: Option<Arc<dyn WriteResultHandler>>,
}

impl MigrationRunner {
    pub fn new(
        registry: Arc<MigrationRegistry>,
        store: Arc<dyn DocumentStore>,
        config: BatchWriterConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            gate: Arc::new(AutoConfirm),
            result_handler: None,
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn ConfirmationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_result_handler(mut self, handler: Arc<dyn WriteResultHandler>) -> Self {
        self.result_handler = Some(handler);
        self
    }

    pub fn config(&self) -> &BatchWriterConfig {
        &self.config
    }

    /// Run the migration registered under `tag` with a fresh counter
    pub async fn run(&self, tag: &str) -> Result<RunSummary> {
        self.run_with_counter(tag, Arc::new(ProgressCounter::new()))
            .await
    }

    /// Run the migration registered under `tag`, recording onto `counter`.
    ///
    /// A task failure is returned as [`BatchError::Migration`] after the writer
    /// has been closed and the counter printed. If the task succeeds but the
    /// final commit fails, that error is returned instead.
    pub async fn run_with_counter(
        &self,
        tag: &str,
        counter: Arc<ProgressCounter>,
    ) -> Result<RunSummary> {
        let task = self
            .registry
            .get(tag)
            .ok_or_else(|| BatchError::UnknownMigration {
                tag: tag.to_string(),
            })?;

        if self.config.production && !self.gate.confirm(tag).await {
            warn!(tag = %tag, "🛑 Production run declined");
            return Err(BatchError::ConfirmationDeclined {
                tag: tag.to_string(),
            });
        }

        let mut writer =
            BoundedBatchWriter::new(Arc::clone(&self.store), Arc::clone(&counter), self.config.clone())?;
        if let Some(handler) = &self.result_handler {
            writer = writer.with_result_handler(Arc::clone(handler));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        log_migration_operation(
            "start",
            tag,
            &run_id.to_string(),
            "running",
            Some(if self.config.dry_run { "dry run" } else { "live" }),
        );

        let task_result = log_action(tag, task.run(&mut writer, &counter)).await;
        let close_result = writer.close().await;
        let counts = counter.print();

        let summary = RunSummary {
            run_id,
            version: system::DOCSTORE_BATCH_VERSION.to_string(),
            tag: tag.to_string(),
            mode: self.config.mode,
            dry_run: self.config.dry_run,
            started_at,
            finished_at: Utc::now(),
            groups_committed: writer.groups_committed(),
            dry_run_skipped: writer.dry_run_skipped(),
            counts,
        };

        match (task_result, close_result) {
            (Ok(()), Ok(_)) => {
                log_migration_operation(
                    "finish",
                    tag,
                    &run_id.to_string(),
                    "completed",
                    Some(&format!("{}", summary.counts)),
                );
                info!(
                    run_id = %run_id,
                    tag = %tag,
                    duration_ms = summary.duration_ms(),
                    groups_committed = summary.groups_committed,
                    "✅ Migration completed"
                );
                Ok(summary)
            }
            (Ok(()), Err(close_error)) => {
                log_migration_operation("finish", tag, &run_id.to_string(), "close_failed", None);
                Err(close_error)
            }
            (Err(source), close_result) => {
                if let Err(close_error) = close_result {
                    log_error(
                        "migration_runner",
                        "close",
                        &close_error.to_string(),
                        Some(tag),
                    );
                }
                log_migration_operation("finish", tag, &run_id.to_string(), "failed", None);
                Err(BatchError::Migration {
                    tag: tag.to_string(),
                    source,
                })
            }
        }
    }
}
