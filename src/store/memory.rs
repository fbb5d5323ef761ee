//! # In-Memory Document Store
//!
//! A complete [`DocumentStore`] kept in process memory. It backs local
//! rehearsals of migrations and the test suite, and mirrors the semantics of
//! a hosted document database closely enough for both:
//!
//! - create fails on an existing document, update fails on a missing one
//! - set replaces the document, or deep-merges objects when `merge` is requested
//! - update replaces the named fields; dotted names address nested fields
//! - atomic commits validate every operation before any is applied
//!
//! Faults can be injected per target path or per commit attempt, and every
//! call is recorded so tests can assert on exactly what reached the store.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{AtomicBatch, BulkWriter, DocumentStore, WriteReceipt};
use crate::error::{StoreError, StoreResult};
use crate::models::{DocumentRef, OperationKind, WriteOperation};

/// Calls observed by the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Size of every atomic commit attempt, in call order
    pub commit_sizes: Vec<usize>,
    /// Targets of every atomic commit attempt, flattened in staging order
    pub commit_targets: Vec<DocumentRef>,
    /// Atomic commits that were applied
    pub commits_applied: u64,
    pub batches_opened: u64,
    pub bulk_writers_opened: u64,
    /// Bulk writes received, in call order
    pub bulk_writes: Vec<DocumentRef>,
    pub bulk_flushes: u64,
    pub bulk_closes: u64,
}

impl StoreStats {
    /// Calls that reached the store: commits, bulk writes, flushes and closes
    pub fn store_calls(&self) -> usize {
        self.commit_sizes.len()
            + self.bulk_writes.len()
            + self.bulk_flushes as usize
            + self.bulk_closes as usize
    }
}

#[derive(Debug, Default)]
struct FaultPlan {
    rejected_targets: HashSet<DocumentRef>,
    /// 1-based commit attempts that fail with contention
    failing_commits: HashSet<usize>,
    unavailable: bool,
}

#[derive(Debug, Default)]
struct StoreInner {
    documents: RwLock<BTreeMap<DocumentRef, Value>>,
    max_batch_size: Option<usize>,
    write_latency: Mutex<Option<Duration>>,
    faults: Mutex<FaultPlan>,
    stats: Mutex<StoreStats>,
}

/// Thread-safe in-memory document store; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<StoreInner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects atomic batches larger than `limit`
    pub fn with_max_batch_size(limit: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                max_batch_size: Some(limit),
                ..StoreInner::default()
            }),
        }
    }

    /// Delay applied to every commit and bulk write
    pub fn with_write_latency(self, latency: Duration) -> Self {
        self.set_write_latency(Some(latency));
        self
    }

    /// Change the write delay; applies to every clone of this store
    pub fn set_write_latency(&self, latency: Option<Duration>) {
        *self.inner.write_latency.lock() = latency;
    }

    /// Seed a document directly, bypassing batches and stats
    pub fn insert(&self, target: DocumentRef, data: Value) {
        self.inner.documents.write().insert(target, data);
    }

    pub fn get(&self, target: &DocumentRef) -> Option<Value> {
        self.inner.documents.read().get(target).cloned()
    }

    pub fn contains(&self, target: &DocumentRef) -> bool {
        self.inner.documents.read().contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.inner.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Documents whose collection path equals `collection`
    pub fn list(&self, collection: &str) -> Vec<(DocumentRef, Value)> {
        self.inner
            .documents
            .read()
            .iter()
            .filter(|(target, _)| target.collection() == collection)
            .map(|(target, value)| (target.clone(), value.clone()))
            .collect()
    }

    /// Reject every write to `target` with a permission error
    pub fn reject_target(&self, target: DocumentRef) {
        self.inner.faults.lock().rejected_targets.insert(target);
    }

    /// Fail the `attempt`-th atomic commit (1-based) with contention
    pub fn fail_commit_attempt(&self, attempt: usize) {
        self.inner.faults.lock().failing_commits.insert(attempt);
    }

    /// Make every call fail until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.faults.lock().unavailable = unavailable;
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.stats.lock().clone()
    }

    async fn simulate_latency(&self) {
        let latency = *self.inner.write_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.inner.faults.lock().unavailable {
            return Err(StoreError::Unavailable {
                message: "store marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn check_target(&self, target: &DocumentRef) -> StoreResult<()> {
        if self.inner.faults.lock().rejected_targets.contains(target) {
            return Err(StoreError::PermissionDenied {
                target: target.clone(),
                message: "write rejected by store rules".to_string(),
            });
        }
        Ok(())
    }

    async fn commit_operations(&self, operations: Vec<WriteOperation>) -> StoreResult<()> {
        let attempt = {
            let mut stats = self.inner.stats.lock();
            stats.commit_sizes.push(operations.len());
            stats
                .commit_targets
                .extend(operations.iter().map(|operation| operation.target.clone()));
            stats.commit_sizes.len()
        };

        self.simulate_latency().await;
        self.check_available()?;

        if self.inner.faults.lock().failing_commits.contains(&attempt) {
            warn!(attempt = attempt, "Injected commit failure");
            return Err(StoreError::Contention {
                message: format!("commit attempt {attempt} aborted"),
            });
        }

        if let Some(limit) = self.inner.max_batch_size {
            if operations.len() > limit {
                return Err(StoreError::BatchTooLarge {
                    size: operations.len(),
                    limit,
                });
            }
        }

        for operation in &operations {
            self.check_target(&operation.target)?;
        }

        {
            let mut documents = self.inner.documents.write();
            let mut working = documents.clone();
            for operation in &operations {
                apply_operation(&mut working, operation)?;
            }
            *documents = working;
        }

        self.inner.stats.lock().commits_applied += 1;
        debug!(size = operations.len(), attempt = attempt, "Atomic commit applied");
        Ok(())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn begin_batch(&self) -> Box<dyn AtomicBatch> {
        self.inner.stats.lock().batches_opened += 1;
        Box::new(MemoryBatch {
            store: self.clone(),
            operations: Vec::new(),
        })
    }

    fn bulk_writer(&self) -> Arc<dyn BulkWriter> {
        self.inner.stats.lock().bulk_writers_opened += 1;
        Arc::new(MemoryBulkWriter {
            store: self.clone(),
            closed: AtomicBool::new(false),
        })
    }

    fn max_batch_size(&self) -> Option<usize> {
        self.inner.max_batch_size
    }
}

struct MemoryBatch {
    store: InMemoryDocumentStore,
    operations: Vec<WriteOperation>,
}

#[async_trait]
impl AtomicBatch for MemoryBatch {
    fn stage(&mut self, operation: WriteOperation) {
        self.operations.push(operation);
    }

    fn len(&self) -> usize {
        self.operations.len()
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryBatch { store, operations } = *self;
        store.commit_operations(operations).await
    }
}

struct MemoryBulkWriter {
    store: InMemoryDocumentStore,
    closed: AtomicBool,
}

#[async_trait]
impl BulkWriter for MemoryBulkWriter {
    async fn write(&self, operation: WriteOperation) -> StoreResult<WriteReceipt> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::WriterClosed);
        }
        self.store
            .inner
            .stats
            .lock()
            .bulk_writes
            .push(operation.target.clone());

        self.store.simulate_latency().await;
        self.store.check_available()?;
        self.store.check_target(&operation.target)?;

        apply_operation(&mut self.store.inner.documents.write(), &operation)?;
        Ok(WriteReceipt {
            target: operation.target,
            kind: operation.kind,
        })
    }

    async fn flush(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::WriterClosed);
        }
        self.store.inner.stats.lock().bulk_flushes += 1;
        self.store.check_available()
    }

    async fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.store.inner.stats.lock().bulk_closes += 1;
        self.store.check_available()
    }
}

fn apply_operation(
    documents: &mut BTreeMap<DocumentRef, Value>,
    operation: &WriteOperation,
) -> StoreResult<()> {
    let target = &operation.target;
    match operation.kind {
        OperationKind::Create => {
            if documents.contains_key(target) {
                return Err(StoreError::AlreadyExists {
                    target: target.clone(),
                });
            }
            documents.insert(target.clone(), required_payload(operation)?.clone());
        }
        OperationKind::Set => {
            let payload = required_payload(operation)?;
            if operation.merge {
                if let Some(existing) = documents.get_mut(target) {
                    deep_merge(existing, payload);
                    return Ok(());
                }
            }
            documents.insert(target.clone(), payload.clone());
        }
        OperationKind::Update => {
            let Value::Object(fields) = required_payload(operation)? else {
                return Err(StoreError::InvalidArgument {
                    target: target.clone(),
                    message: "update payload must be an object".to_string(),
                });
            };
            let existing = documents
                .get_mut(target)
                .ok_or_else(|| StoreError::NotFound {
                    target: target.clone(),
                })?;
            for (field, value) in fields {
                set_field_path(existing, field, value.clone());
            }
        }
        OperationKind::Delete => {
            documents.remove(target);
        }
    }
    Ok(())
}

fn required_payload(operation: &WriteOperation) -> StoreResult<&Value> {
    operation
        .payload
        .as_ref()
        .ok_or_else(|| StoreError::InvalidArgument {
            target: operation.target.clone(),
            message: format!("{} requires a payload", operation.kind),
        })
}

fn deep_merge(existing: &mut Value, incoming: &Value) {
    match (existing, incoming) {
        (Value::Object(current), Value::Object(patch)) => {
            for (key, value) in patch {
                match current.get_mut(key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        current.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

fn set_field_path(document: &mut Value, path: &str, value: Value) {
    if !document.is_object() {
        *document = Value::Object(Map::new());
    }
    let Value::Object(map) = document else {
        return;
    };
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_field_path(child, rest, value);
        }
    }
}
