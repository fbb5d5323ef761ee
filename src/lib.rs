#![allow(clippy::doc_markdown)] // Allow technical terms like Firestore, BulkWriter in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Docstore Batch
//!
//! Bounded-batch write coordination for one-off document-store migrations and
//! backfills.
//!
//! ## Overview
//!
//! Migration scripts typically read a working set into memory, compute updates,
//! and write them back. Document stores cap how many operations a single atomic
//! commit may carry. [`BoundedBatchWriter`] takes the stream of writes produced
//! by such a script and turns it into a sequence of bounded groups, committed
//! strictly in order, while a shared [`ProgressCounter`] tracks reads, writes
//! and failures for the end-of-run summary.
//!
//! ## Architecture
//!
//! ```text
//! MigrationRunner ──> MigrationTask::run(&mut writer, &counter)
//!                            │
//!                            ▼
//!                   BoundedBatchWriter ──> WriteGroup (≤ max_group_size)
//!                            │
//!             ┌──────────────┴──────────────┐
//!             ▼                             ▼
//!     AtomicBatch (atomic)          BulkWriter (best effort)
//! ```
//!
//! ## Module Organization
//!
//! - [`writer`] - The bounded write coordinator and its lifecycle
//! - [`models`] - Operations, groups and commit results
//! - [`store`] - Store traits and the in-memory store
//! - [`metrics`] - Progress counter and progress tracker
//! - [`migration`] - Task registry, confirmation gate and runner
//! - [`config`] - Writer configuration and layered loading
//! - [`logging`] - Structured logging setup and helpers
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
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
//! docstore_batch::logging::init_structured_logging();
//!
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let counter = Arc::new(ProgressCounter::new());
//! let mut writer = BoundedBatchWriter::new(store, counter.clone(), BatchWriterConfig::atomic(3))?;
//!
//! for id in 0..5 {
//!     let target = DocumentRef::in_collection("users", &id.to_string());
//!     writer.add(|group| group.set(target, json!({ "active": true }))).await?;
//! }
//! writer.close().await?;
//! assert_eq!(counter.writes(), 5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod migration;
pub mod models;
pub mod store;
pub mod writer;

pub use config::{BatchWriterConfig, ConfigLoader, WriteMode};
pub use constants::{counter_keys, system};
pub use error::{BatchError, ConfigurationError, Result, StoreError, StoreResult};
pub use metrics::{CounterSnapshot, ProgressCounter, ProgressTracker};
pub use migration::{
    AutoConfirm, ConfirmationGate, DenyAll, MigrationRegistry, MigrationRunner, MigrationTask,
    RunSummary, StdinConfirmationGate,
};
pub use models::{
    CommitResult, DocumentRef, OperationFailure, OperationKind, SealedGroup, SetOptions,
    WriteGroup, WriteOperation,
};
pub use store::{AtomicBatch, BulkWriter, DocumentStore, InMemoryDocumentStore, WriteReceipt};
pub use writer::{
    BoundedBatchWriter, LoggingResultHandler, RecordingResultHandler, WriteResultHandler,
    WriterState,
};
