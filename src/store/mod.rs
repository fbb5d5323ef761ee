//! # Backing Store Interfaces
//!
//! The writer talks to a document store through two interchangeable contracts:
//!
//! - **Atomic batches** ([`AtomicBatch`]): operations are staged locally and
//!   applied all-or-nothing by a single `commit()`
//! - **Bulk writes** ([`BulkWriter`]): each operation is sent on its own and
//!   resolves independently; `flush()` waits for in-flight writes and `close()`
//!   flushes and refuses further work
//!
//! Reads are the caller's responsibility and are not part of these traits.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{BatchError, StoreError, StoreResult};
use crate::models::{DocumentRef, OperationKind, SetOptions, WriteOperation};

pub use memory::InMemoryDocumentStore;

/// Acknowledgement for a single bulk write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub target: DocumentRef,
    pub kind: OperationKind,
}

/// Entry point to a document store
pub trait DocumentStore: Send + Sync {
    /// Open an empty atomic batch
    fn begin_batch(&self) -> Box<dyn AtomicBatch>;

    /// Obtain a bulk writer with independent per-operation outcomes
    fn bulk_writer(&self) -> Arc<dyn BulkWriter>;

    /// Largest atomic batch the store accepts, if it enforces one
    fn max_batch_size(&self) -> Option<usize> {
        None
    }
}

/// Operations staged for one all-or-nothing commit
#[async_trait]
pub trait AtomicBatch: Send {
    /// Stage an operation; nothing reaches the store until `commit`
    fn stage(&mut self, operation: WriteOperation);

    /// Number of staged operations
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every staged operation, or none of them
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    fn create(&mut self, target: DocumentRef, data: Value) {
        self.stage(WriteOperation::create(target, data));
    }

    fn set(&mut self, target: DocumentRef, data: Value, options: SetOptions) {
        self.stage(WriteOperation::set(target, data, options));
    }

    /// Stage an update; `fields` must be an object of field paths
    fn update(&mut self, target: DocumentRef, fields: Value) -> StoreResult<()> {
        self.stage(validated_update(target, fields)?);
        Ok(())
    }

    fn delete(&mut self, target: DocumentRef) {
        self.stage(WriteOperation::delete(target));
    }
}

/// Best-effort writer where each operation succeeds or fails on its own
#[async_trait]
pub trait BulkWriter: Send + Sync {
    /// Send one operation and resolve with its individual outcome
    async fn write(&self, operation: WriteOperation) -> StoreResult<WriteReceipt>;

    /// Wait until every write issued so far has resolved
    async fn flush(&self) -> StoreResult<()>;

    /// Flush, then refuse further writes
    async fn close(&self) -> StoreResult<()>;

    async fn create(&self, target: DocumentRef, data: Value) -> StoreResult<WriteReceipt> {
        self.write(WriteOperation::create(target, data)).await
    }

    async fn set(
        &self,
        target: DocumentRef,
        data: Value,
        options: SetOptions,
    ) -> StoreResult<WriteReceipt> {
        self.write(WriteOperation::set(target, data, options)).await
    }

    async fn update(&self, target: DocumentRef, fields: Value) -> StoreResult<WriteReceipt> {
        let operation = validated_update(target, fields)?;
        self.write(operation).await
    }

    async fn delete(&self, target: DocumentRef) -> StoreResult<WriteReceipt> {
        self.write(WriteOperation::delete(target)).await
    }
}

fn validated_update(target: DocumentRef, fields: Value) -> StoreResult<WriteOperation> {
    WriteOperation::update(target.clone(), fields).map_err(|error| {
        let message = match error {
            BatchError::InvalidOperation { reason, .. } => reason,
            other => other.to_string(),
        };
        StoreError::InvalidArgument { target, message }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_helpers_reject_non_object_fields() {
        let store = InMemoryDocumentStore::new();
        let target = DocumentRef::new("users/a");
        store.insert(target.clone(), json!({ "name": "A" }));

        let mut batch = store.begin_batch();
        let staged = batch.update(target.clone(), json!("not fields"));
        assert!(matches!(staged, Err(StoreError::InvalidArgument { .. })));
        assert!(batch.is_empty());

        let bulk = store.bulk_writer();
        let written = bulk.update(target.clone(), json!(42)).await;
        assert!(matches!(written, Err(StoreError::InvalidArgument { .. })));
        assert!(store.stats().bulk_writes.is_empty());
        assert_eq!(store.get(&target), Some(json!({ "name": "A" })));
    }
}
