//! # Bounded Batch Writer
//!
//! Accepts a stream of write operations from a caller iterating over an
//! in-memory working set and submits them to the store in groups of at most
//! `max_group_size` operations.
//!
//! ## Guarantees
//!
//! - **Commit before append when full**: if the open group is full, `add`
//!   commits it and opens a fresh one *before* running the caller's closure, so
//!   no group ever exceeds the cap
//! - **Sequential groups**: group N+1 is never submitted before group N's
//!   commit has been awaited, and operations reach the store in the order they
//!   were added
//! - **No silent loss**: whole-group failures, writes after close and cap
//!   violations are returned to the caller; per-operation failures in
//!   best-effort mode are counted and reported through the result handler
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docstore_batch::{
//!     BatchWriterConfig, BoundedBatchWriter, DocumentRef, InMemoryDocumentStore,
//!     ProgressCounter,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> docstore_batch::Result<()> {
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let counter = Arc::new(ProgressCounter::new());
//! let mut writer = BoundedBatchWriter::new(store, counter.clone(), BatchWriterConfig::atomic(450))?;
//!
//! for id in ["alice", "bob"] {
//!     writer
//!         .add(|group| group.set(DocumentRef::in_collection("users", id), json!({ "migrated": true })))
//!         .await?;
//! }
//! writer.close().await?;
//! counter.print();
//! # Ok(())
//! # }
//! ```

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::handler::{LoggingResultHandler, WriteResultHandler};
use super::state::WriterState;
use crate::config::{BatchWriterConfig, WriteMode};
use crate::constants::counter_keys;
use crate::error::{BatchError, ConfigurationError, Result};
use crate::logging::{log_error, log_group_operation};
use crate::metrics::{ProgressCounter, ProgressTracker};
use crate::models::{CommitResult, OperationFailure, SealedGroup, WriteGroup};
use crate::store::{BulkWriter, DocumentStore};

/// Groups operations into bounded, sequential commits
pub struct BoundedBatchWriter {
    writer_id: Uuid,
    store: Arc<dyn DocumentStore>,
    counter: Arc<ProgressCounter>,
    config: BatchWriterConfig,
    state: WriterState,
    group: WriteGroup,
    bulk_writer: Option<Arc<dyn BulkWriter>>,
    result_handler: Arc<dyn WriteResultHandler>,
    progress: Option<ProgressTracker>,
    /// Index and size of the group whose commit is awaiting the store
    in_flight: Option<(u64, usize)>,
    groups_committed: u64,
    operations_processed: u64,
    dry_run_skipped: u64,
}

impl BoundedBatchWriter {
    /// Create a writer bound to one store and one counter.
    ///
    /// Fails when the configuration is invalid, or when atomic mode asks for
    /// groups larger than the store can commit at once.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        counter: Arc<ProgressCounter>,
        config: BatchWriterConfig,
    ) -> Result<Self> {
        config.validate()?;

        if config.mode == WriteMode::Atomic {
            if let Some(limit) = store.max_batch_size() {
                if config.max_group_size > limit {
                    return Err(ConfigurationError::invalid_value(
                        "max_group_size",
                        config.max_group_size,
                        format!("store commits at most {limit} operations atomically"),
                    )
                    .into());
                }
            }
        }

        let writer_id = Uuid::new_v4();
        info!(
            writer_id = %writer_id,
            max_group_size = config.max_group_size,
            mode = %config.mode,
            dry_run = config.dry_run,
            "🗂️ Batch writer initialized"
        );

        Ok(Self {
            writer_id,
            store,
            counter,
            group: WriteGroup::new(0, config.max_group_size),
            config,
            state: WriterState::default(),
            bulk_writer: None,
            result_handler: Arc::new(LoggingResultHandler),
            progress: None,
            in_flight: None,
            groups_committed: 0,
            operations_processed: 0,
            dry_run_skipped: 0,
        })
    }

    /// Replace the default logging handler for best-effort outcomes
    pub fn with_result_handler(mut self, handler: Arc<dyn WriteResultHandler>) -> Self {
        self.result_handler = handler;
        self
    }

    /// Log write progress against an expected number of operations
    pub fn with_progress(mut self, expected_operations: u64) -> Self {
        let mut tracker = ProgressTracker::new(
            format!("writes:{}", self.writer_id),
            self.config.progress_log_percent,
        );
        tracker.start(expected_operations, 0);
        self.progress = Some(tracker);
        self
    }

    pub fn writer_id(&self) -> Uuid {
        self.writer_id
    }

    pub fn config(&self) -> &BatchWriterConfig {
        &self.config
    }

    pub fn counter(&self) -> &Arc<ProgressCounter> {
        &self.counter
    }

    /// Current lifecycle state. Reads `Committing` after a commit future was
    /// dropped mid-flight, until the next call settles it.
    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Operations pending in the not-yet-committed group; always zero in dry-run mode
    pub fn current_group_size(&self) -> usize {
        self.group.len()
    }

    pub fn groups_committed(&self) -> u64 {
        self.groups_committed
    }

    /// Operations a dry run would have written
    pub fn dry_run_skipped(&self) -> u64 {
        self.dry_run_skipped
    }

    /// Run `append` against the open group.
    ///
    /// When the group is already full it is committed first, and the commit is
    /// awaited before `append` runs. If that commit fails its error is returned
    /// and `append` is not run.
    ///
    /// `append` receives a staging group sized to the open group's remaining
    /// headroom. Its operations join the open group only if it returns `Ok`,
    /// so a failed closure leaves the open group as it was.
    pub async fn add<F>(&mut self, append: F) -> Result<()>
    where
        F: FnOnce(&mut WriteGroup) -> Result<()>,
    {
        self.settle_interrupted_commit()?;
        if !self.state.accepts_operations() {
            return Err(BatchError::WriterClosed);
        }

        if self.config.dry_run {
            let index = self.group.index();
            let mut scratch = WriteGroup::new(index, self.config.max_group_size);
            append(&mut scratch)?;
            self.check_staged(&scratch, index, self.config.max_group_size)?;
            self.dry_run_skipped += scratch.len() as u64;
            debug!(
                writer_id = %self.writer_id,
                skipped = scratch.len(),
                "Dry run: operations discarded"
            );
            return Ok(());
        }

        if self.group.is_full() {
            debug!(
                writer_id = %self.writer_id,
                group_index = self.group.index(),
                "Group full, committing before append"
            );
            self.commit().await?;
        }

        let index = self.group.index();
        let headroom = self.group.headroom();
        let mut staged = WriteGroup::new(index, headroom);
        if let Err(error) = append(&mut staged) {
            return Err(match error {
                BatchError::GroupOverflow { .. } => self.overflow(staged.len()),
                other => other,
            });
        }
        self.check_staged(&staged, index, headroom)?;

        let appended = staged.len();
        self.group.absorb(staged);
        self.counter
            .add_to_custom_count(counter_keys::QUEUED_WRITES, appended as u64);
        self.state = WriterState::Open(self.group.len());
        Ok(())
    }

    /// Submit the open group and await the store.
    ///
    /// A no-op returning an empty result when the group is empty or the writer
    /// is in dry-run mode, so repeated calls are safe.
    pub async fn commit(&mut self) -> Result<CommitResult> {
        self.settle_interrupted_commit()?;
        if self.config.dry_run || self.group.is_empty() {
            return Ok(CommitResult::empty(self.group.index()));
        }

        let group = self.seal_open_group();
        let size = group.len();
        self.in_flight = Some((group.index(), size));
        self.state = WriterState::Committing;

        let outcome = match self.config.mode {
            WriteMode::Atomic => self.commit_atomic(group).await,
            WriteMode::BestEffort => self.commit_best_effort(group).await,
        };
        self.in_flight = None;

        self.operations_processed += size as u64;
        if let Some(progress) = self.progress.as_mut() {
            if progress.total() < self.operations_processed {
                progress.set_total(self.operations_processed);
            }
            progress.update(self.operations_processed);
        }
        self.state = WriterState::Open(0);
        outcome
    }

    /// Commit whatever is pending, then stop accepting operations.
    ///
    /// The writer ends up closed even when the final commit fails; that
    /// failure is still returned. Closing a closed writer is a no-op.
    pub async fn close(&mut self) -> Result<CommitResult> {
        if self.state.is_terminal() {
            return Ok(CommitResult::empty(self.group.index()));
        }

        let interrupted = self.settle_interrupted_commit();
        let final_commit = self.commit().await;
        let bulk_close = match self.bulk_writer.take() {
            Some(bulk) => bulk
                .close()
                .await
                .map_err(|source| BatchError::BulkWriterFailed {
                    operation: "close",
                    source,
                }),
            None => Ok(()),
        };

        self.state = WriterState::Closed;
        if let Some(progress) = self.progress.as_mut() {
            progress.stop();
        }

        info!(
            writer_id = %self.writer_id,
            groups_committed = self.groups_committed,
            operations_processed = self.operations_processed,
            dry_run_skipped = self.dry_run_skipped,
            "🔒 Batch writer closed"
        );

        interrupted?;
        let result = final_commit?;
        bulk_close?;
        Ok(result)
    }

    /// Account for a commit whose future was dropped before the store answered.
    ///
    /// Its operations are counted as failed, the writer reopens, and the
    /// interruption is reported once as [`BatchError::CommitInterrupted`].
    fn settle_interrupted_commit(&mut self) -> Result<()> {
        let Some((group_index, size)) = self.in_flight.take() else {
            return Ok(());
        };
        self.record_interrupted(group_index, size);
        self.operations_processed += size as u64;
        self.state = WriterState::Open(self.group.len());
        Err(BatchError::CommitInterrupted { group_index, size })
    }

    fn record_interrupted(&self, group_index: u64, size: usize) {
        self.counter
            .add_to_custom_count(counter_keys::FAILED_WRITES, size as u64);
        self.counter.custom_count_increment(counter_keys::FAILED_GROUPS);
        warn!(
            writer_id = %self.writer_id,
            group_index = group_index,
            size = size,
            "⚠️ Commit interrupted before the store answered; operations counted as failed"
        );
    }

    /// Reject a staging group that no longer matches what the writer handed out
    fn check_staged(&self, staged: &WriteGroup, index: u64, capacity: usize) -> Result<()> {
        if staged.index() == index && staged.capacity() == capacity && staged.len() <= capacity {
            return Ok(());
        }
        log_error(
            "batch_writer",
            "add",
            "staged operations exceed the group cap",
            Some(&format!(
                "group {index}: {} staged with {capacity} headroom",
                staged.len()
            )),
        );
        Err(self.overflow(staged.len()))
    }

    fn overflow(&self, staged: usize) -> BatchError {
        BatchError::GroupOverflow {
            size: self.group.len() + staged,
            limit: self.config.max_group_size,
        }
    }

    /// Refuse to submit a sealed group larger than the cap; its operations count as failed
    fn ensure_within_cap(&self, group: &SealedGroup) -> Result<()> {
        if group.len() <= self.config.max_group_size {
            return Ok(());
        }
        self.counter
            .add_to_custom_count(counter_keys::FAILED_WRITES, group.len() as u64);
        self.counter.custom_count_increment(counter_keys::FAILED_GROUPS);
        Err(BatchError::GroupOverflow {
            size: group.len(),
            limit: self.config.max_group_size,
        })
    }

    fn seal_open_group(&mut self) -> SealedGroup {
        let next = WriteGroup::new(self.group.index() + 1, self.config.max_group_size);
        std::mem::replace(&mut self.group, next).seal()
    }

    async fn commit_atomic(&mut self, group: SealedGroup) -> Result<CommitResult> {
        self.ensure_within_cap(&group)?;
        let group_index = group.index();
        let size = group.len();

        let mut batch = self.store.begin_batch();
        for operation in group.into_operations() {
            batch.stage(operation);
        }

        match batch.commit().await {
            Ok(()) => {
                self.groups_committed += 1;
                self.counter.add_to_write_count(size as u64);
                self.counter
                    .add_to_custom_count(counter_keys::SUCCESSFUL_WRITES, size as u64);
                self.counter
                    .custom_count_increment(counter_keys::GROUPS_COMMITTED);
                log_group_operation(
                    "commit",
                    &self.writer_id.to_string(),
                    group_index,
                    size,
                    "committed",
                    None,
                );
                Ok(CommitResult::all_succeeded(group_index, size))
            }
            Err(source) => {
                self.counter
                    .add_to_custom_count(counter_keys::FAILED_WRITES, size as u64);
                self.counter.custom_count_increment(counter_keys::FAILED_GROUPS);
                log_error(
                    "batch_writer",
                    "commit",
                    &source.to_string(),
                    Some(&format!("group {group_index} with {size} operations")),
                );
                Err(BatchError::GroupCommitFailed {
                    group_index,
                    size,
                    source,
                })
            }
        }
    }

    async fn commit_best_effort(&mut self, group: SealedGroup) -> Result<CommitResult> {
        self.ensure_within_cap(&group)?;
        let group_index = group.index();
        let size = group.len();
        let bulk = self.ensure_bulk_writer();

        let writes = group.into_operations().into_iter().map(|operation| {
            let bulk = Arc::clone(&bulk);
            async move {
                let outcome = bulk.write(operation.clone()).await;
                (operation, outcome)
            }
        });
        let outcomes = join_all(writes).await;

        let mut result = CommitResult {
            group_index,
            size,
            ..CommitResult::default()
        };
        for (operation, outcome) in outcomes {
            match outcome {
                Ok(receipt) => {
                    result.succeeded += 1;
                    self.result_handler.on_success(&receipt);
                }
                Err(error) => {
                    result.failed += 1;
                    self.result_handler.on_failure(&operation, &error);
                    result
                        .errors
                        .push(OperationFailure::new(operation.target, &error));
                }
            }
        }

        self.groups_committed += 1;
        self.counter.add_to_write_count(result.succeeded as u64);
        self.counter
            .add_to_custom_count(counter_keys::SUCCESSFUL_WRITES, result.succeeded as u64);
        self.counter
            .add_to_custom_count(counter_keys::FAILED_WRITES, result.failed as u64);
        self.counter
            .custom_count_increment(counter_keys::GROUPS_COMMITTED);

        bulk.flush()
            .await
            .map_err(|source| BatchError::BulkWriterFailed {
                operation: "flush",
                source,
            })?;

        log_group_operation(
            "flush",
            &self.writer_id.to_string(),
            group_index,
            size,
            if result.is_success() { "flushed" } else { "partial" },
            Some(&format!("{} succeeded, {} failed", result.succeeded, result.failed)),
        );

        let pause = self.config.flush_pause();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        Ok(result)
    }

    fn ensure_bulk_writer(&mut self) -> Arc<dyn BulkWriter> {
        Arc::clone(
            self.bulk_writer
                .get_or_insert_with(|| self.store.bulk_writer()),
        )
    }
}

impl Drop for BoundedBatchWriter {
    fn drop(&mut self) {
        if let Some((group_index, size)) = self.in_flight.take() {
            self.record_interrupted(group_index, size);
        }
        if !self.state.is_terminal() && !self.group.is_empty() {
            warn!(
                writer_id = %self.writer_id,
                pending = self.group.len(),
                "⚠️ Batch writer dropped without close(); pending operations were not committed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentRef;
    use crate::store::InMemoryDocumentStore;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    fn writer_with(
        store: &InMemoryDocumentStore,
        config: BatchWriterConfig,
    ) -> (BoundedBatchWriter, Arc<ProgressCounter>) {
        let counter = Arc::new(ProgressCounter::new());
        let writer =
            BoundedBatchWriter::new(Arc::new(store.clone()), Arc::clone(&counter), config).unwrap();
        (writer, counter)
    }

    fn user(id: usize) -> DocumentRef {
        DocumentRef::in_collection("users", &id.to_string())
    }

    #[tokio::test]
    async fn test_add_appends_to_open_group() {
        let store = InMemoryDocumentStore::new();
        let (mut writer, counter) = writer_with(&store, BatchWriterConfig::atomic(5));

        writer.add(|g| g.set(user(1), json!({"n": 1}))).await.unwrap();
        writer.add(|g| g.set(user(2), json!({"n": 2}))).await.unwrap();

        assert_eq!(writer.current_group_size(), 2);
        assert_eq!(writer.state(), WriterState::Open(2));
        assert_eq!(counter.get_custom_count(counter_keys::QUEUED_WRITES), 2);
        assert_eq!(counter.writes(), 0);
        assert!(store.stats().commit_sizes.is_empty());
    }

    #[tokio::test]
    async fn test_commit_before_append_when_full() {
        let store = InMemoryDocumentStore::new();
        let (mut writer, _) = writer_with(&store, BatchWriterConfig::atomic(2));

        for id in 0..2 {
            writer.add(|g| g.set(user(id), json!({}))).await.unwrap();
        }
        assert_eq!(writer.current_group_size(), 2);
        assert!(store.stats().commit_sizes.is_empty());

        writer.add(|g| g.set(user(2), json!({}))).await.unwrap();
        assert_eq!(store.stats().commit_sizes, vec![2]);
        assert_eq!(writer.current_group_size(), 1);
    }

    #[tokio::test]
    async fn test_empty_commit_is_noop() {
        let store = InMemoryDocumentStore::new();
        let (mut writer, counter) = writer_with(&store, BatchWriterConfig::atomic(10));

        let result = writer.commit().await.unwrap();
        assert!(result.is_noop());
        assert_eq!(store.stats().store_calls(), 0);
        assert_eq!(store.stats().batches_opened, 0);
        assert_eq!(counter.get_custom_count(counter_keys::GROUPS_COMMITTED), 0);
    }

    #[tokio::test]
    async fn test_failed_append_rolls_back_partial_additions() {
        let store = InMemoryDocumentStore::new();
        let (mut writer, _) = writer_with(&store, BatchWriterConfig::atomic(3));
        writer.add(|g| g.set(user(0), json!({}))).await.unwrap();

        let result = writer
            .add(|g| {
                g.set(user(1), json!({}))?;
                g.set(user(2), json!({}))?;
                g.set(user(3), json!({}))
            })
            .await;

        assert!(matches!(
            result,
            Err(BatchError::GroupOverflow { size: 3, limit: 3 })
        ));
        assert_eq!(writer.current_group_size(), 1);
    }

    #[tokio::test]
    async fn test_add_after_close_is_fatal() {
        let store = InMemoryDocumentStore::new();
        let (mut writer, _) = writer_with(&store, BatchWriterConfig::atomic(10));
        writer.close().await.unwrap();

        let result = writer.add(|g| g.delete(user(1))).await;
        assert!(matches!(result, Err(BatchError::WriterClosed)));
        assert!(writer.close().await.unwrap().is_noop());
    }

    #[tokio::test]
    async fn test_group_failure_is_surfaced_and_counted() {
        let store = InMemoryDocumentStore::new();
        store.fail_commit_attempt(1);
        let (mut writer, counter) = writer_with(&store, BatchWriterConfig::atomic(10));

        for id in 0..3 {
            writer.add(|g| g.create(user(id), json!({}))).await.unwrap();
        }
        let result = writer.commit().await;

        assert!(matches!(
            result,
            Err(BatchError::GroupCommitFailed {
                group_index: 0,
                size: 3,
                ..
            })
        ));
        assert_eq!(writer.state(), WriterState::Open(0));
        assert_eq!(counter.failed_writes(), 3);
        assert_eq!(counter.get_custom_count(counter_keys::FAILED_GROUPS), 1);
        assert_eq!(counter.writes(), 0);
        assert!(store.is_empty());

        // No retry: the failed group is gone and the writer keeps going
        writer.add(|g| g.create(user(9), json!({}))).await.unwrap();
        writer.close().await.unwrap();
        assert_eq!(store.stats().commit_sizes, vec![3, 1]);
        assert_eq!(counter.writes(), 1);
    }

    #[tokio::test]
    async fn test_group_size_above_store_limit_rejected() {
        let store = InMemoryDocumentStore::with_max_batch_size(500);
        let counter = Arc::new(ProgressCounter::new());

        let result = BoundedBatchWriter::new(
            Arc::new(store.clone()),
            Arc::clone(&counter),
            BatchWriterConfig::atomic(501),
        );
        assert!(matches!(result, Err(BatchError::Configuration(_))));

        // The limit is a flush interval in best-effort mode
        assert!(BoundedBatchWriter::new(
            Arc::new(store),
            counter,
            BatchWriterConfig::best_effort(501)
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_runs_closures_without_touching_store() {
        let store = InMemoryDocumentStore::new();
        let (mut writer, counter) =
            writer_with(&store, BatchWriterConfig::atomic(2).with_dry_run(true));

        for id in 0..5 {
            writer.add(|g| g.set(user(id), json!({}))).await.unwrap();
        }
        assert_eq!(writer.current_group_size(), 0);
        writer.commit().await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(writer.dry_run_skipped(), 5);
        assert_eq!(store.stats(), Default::default());
        assert_eq!(counter.writes(), 0);
        assert_eq!(counter.get_custom_count(counter_keys::QUEUED_WRITES), 0);
    }

    #[tokio::test]
    async fn test_best_effort_tallies_each_operation() {
        let store = InMemoryDocumentStore::new();
        store.reject_target(user(1));
        let (mut writer, counter) = writer_with(&store, BatchWriterConfig::best_effort(3));

        for id in 0..3 {
            writer.add(|g| g.set(user(id), json!({}))).await.unwrap();
        }
        let result = writer.commit().await.unwrap();

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].target, user(1));
        assert_eq!(counter.writes(), 2);
        assert_eq!(counter.failed_writes(), 1);
        assert_eq!(store.stats().bulk_flushes, 1);

        writer.close().await.unwrap();
        assert_eq!(store.stats().bulk_closes, 1);
    }

    #[tokio::test]
    async fn test_progress_tracks_processed_operations() {
        let store = InMemoryDocumentStore::new();
        let (writer, _) = writer_with(&store, BatchWriterConfig::atomic(2));
        let mut writer = writer.with_progress(4);

        for id in 0..4 {
            writer.add(|g| g.set(user(id), json!({}))).await.unwrap();
        }
        writer.close().await.unwrap();

        assert_eq!(writer.groups_committed(), 2);
        assert_eq!(writer.progress.as_ref().unwrap().current(), 4);
    }

    #[tokio::test]
    async fn test_replaced_group_cannot_exceed_cap() {
        let store = InMemoryDocumentStore::new();
        let (mut writer, counter) = writer_with(&store, BatchWriterConfig::atomic(3));
        writer.add(|g| g.set(user(0), json!({}))).await.unwrap();

        let result = writer
            .add(|g| {
                *g = WriteGroup::new(g.index(), 1000);
                for id in 1..=10 {
                    g.set(user(id), json!({}))?;
                }
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(BatchError::GroupOverflow { size: 11, limit: 3 })
        ));
        // The open group is untouched and nothing reached the store
        assert_eq!(writer.current_group_size(), 1);
        assert_eq!(writer.state(), WriterState::Open(1));
        assert_eq!(counter.get_custom_count(counter_keys::QUEUED_WRITES), 1);
        assert!(store.stats().commit_sizes.is_empty());

        writer.close().await.unwrap();
        assert_eq!(store.stats().commit_sizes, vec![1]);
    }

    #[tokio::test]
    async fn test_replaced_scratch_group_rejected_in_dry_run() {
        let store = InMemoryDocumentStore::new();
        let (mut writer, _) =
            writer_with(&store, BatchWriterConfig::atomic(2).with_dry_run(true));

        let result = writer
            .add(|g| {
                *g = WriteGroup::new(g.index(), 50);
                for id in 0..5 {
                    g.delete(user(id))?;
                }
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(BatchError::GroupOverflow { .. })));
        assert_eq!(writer.dry_run_skipped(), 0);
    }

    #[tokio::test]
    async fn test_oversized_sealed_group_is_refused() {
        let store = InMemoryDocumentStore::new();
        let (mut writer, counter) = writer_with(&store, BatchWriterConfig::atomic(2));

        let mut oversized = WriteGroup::new(0, 5);
        for id in 0..5 {
            oversized.delete(user(id)).unwrap();
        }
        writer.group = oversized;

        let result = writer.commit().await;
        assert!(matches!(
            result,
            Err(BatchError::GroupOverflow { size: 5, limit: 2 })
        ));
        assert_eq!(counter.failed_writes(), 5);
        assert_eq!(store.stats().batches_opened, 0);
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_commit_is_settled_on_next_call() {
        let store = InMemoryDocumentStore::new().with_write_latency(Duration::from_millis(200));
        let (mut writer, counter) = writer_with(&store, BatchWriterConfig::atomic(5));
        writer.add(|g| g.set(user(0), json!({}))).await.unwrap();
        writer.add(|g| g.set(user(1), json!({}))).await.unwrap();

        let cancelled = timeout(Duration::from_millis(10), writer.commit()).await;
        assert!(cancelled.is_err());
        assert_eq!(writer.state(), WriterState::Committing);

        let result = writer.commit().await;
        assert!(matches!(
            result,
            Err(BatchError::CommitInterrupted {
                group_index: 0,
                size: 2
            })
        ));
        assert_eq!(writer.state(), WriterState::Open(0));
        assert_eq!(counter.failed_writes(), 2);
        assert!(writer.commit().await.unwrap().is_noop());
    }

    #[tokio::test]
    async fn test_dropping_writer_mid_commit_counts_failures() {
        let store = InMemoryDocumentStore::new().with_write_latency(Duration::from_millis(200));
        let (mut writer, counter) = writer_with(&store, BatchWriterConfig::atomic(5));
        writer.add(|g| g.set(user(0), json!({}))).await.unwrap();

        let _ = timeout(Duration::from_millis(10), writer.commit()).await;
        drop(writer);

        assert_eq!(counter.failed_writes(), 1);
        assert_eq!(counter.get_custom_count(counter_keys::FAILED_GROUPS), 1);
    }
}
