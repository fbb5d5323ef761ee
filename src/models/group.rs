//! # Write Groups
//!
//! An ordered, bounded set of operations committed together. A [`WriteGroup`]
//! is the open, appendable form handed to `add` closures; [`SealedGroup`] is
//! the immutable form produced the moment a commit is requested.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::operation::{DocumentRef, SetOptions, WriteOperation};
use crate::error::{BatchError, Result, StoreError};

/// Open group accepting operations up to its capacity.
///
/// Only the writer creates groups; callers reach one through the `&mut`
/// handed to `add` closures and can only append to it.
#[derive(Debug)]
pub struct WriteGroup {
    index: u64,
    capacity: usize,
    operations: Vec<WriteOperation>,
}

impl WriteGroup {
    pub(crate) fn new(index: u64, capacity: usize) -> Self {
        Self {
            index,
            capacity,
            operations: Vec::new(),
        }
    }

    /// Position of this group in the writer's commit sequence
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.operations.len() >= self.capacity
    }

    /// Remaining headroom before the group reaches its cap
    pub fn headroom(&self) -> usize {
        self.capacity.saturating_sub(self.operations.len())
    }

    pub fn operations(&self) -> &[WriteOperation] {
        &self.operations
    }

    /// Append an operation. Appending past the cap is an invariant violation.
    pub fn push(&mut self, operation: WriteOperation) -> Result<()> {
        if self.is_full() {
            return Err(BatchError::GroupOverflow {
                size: self.operations.len(),
                limit: self.capacity,
            });
        }
        self.operations.push(operation);
        Ok(())
    }

    /// Move the operations of a staged group onto the end of this one
    pub(crate) fn absorb(&mut self, staged: WriteGroup) {
        self.operations.extend(staged.operations);
    }

    pub fn create(&mut self, target: DocumentRef, data: Value) -> Result<()> {
        self.push(WriteOperation::create(target, data))
    }

    pub fn set(&mut self, target: DocumentRef, data: Value) -> Result<()> {
        self.push(WriteOperation::set(target, data, SetOptions::default()))
    }

    pub fn set_with_options(
        &mut self,
        target: DocumentRef,
        data: Value,
        options: SetOptions,
    ) -> Result<()> {
        self.push(WriteOperation::set(target, data, options))
    }

    pub fn update(&mut self, target: DocumentRef, fields: Value) -> Result<()> {
        self.push(WriteOperation::update(target, fields)?)
    }

    pub fn delete(&mut self, target: DocumentRef) -> Result<()> {
        self.push(WriteOperation::delete(target))
    }

    /// Freeze the group for commit
    pub(crate) fn seal(self) -> SealedGroup {
        SealedGroup {
            index: self.index,
            operations: self.operations,
        }
    }
}

/// Immutable group handed to the store
#[derive(Debug, Clone)]
pub struct SealedGroup {
    index: u64,
    operations: Vec<WriteOperation>,
}

impl SealedGroup {
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[WriteOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<WriteOperation> {
        self.operations
    }
}

/// Why a single operation failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub target: DocumentRef,
    pub reason: String,
}

impl OperationFailure {
    pub fn new(target: DocumentRef, error: &StoreError) -> Self {
        Self {
            target,
            reason: error.to_string(),
        }
    }
}

/// Outcome of submitting one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    pub group_index: u64,
    pub size: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Per-operation failures in submission order; may be empty on a whole-group failure
    pub errors: Vec<OperationFailure>,
}

impl CommitResult {
    /// Result for a commit that had nothing to do
    pub fn empty(group_index: u64) -> Self {
        Self {
            group_index,
            ..Self::default()
        }
    }

    pub fn all_succeeded(group_index: u64, size: usize) -> Self {
        Self {
            group_index,
            size,
            succeeded: size,
            ..Self::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        self.size == 0
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_past_capacity_is_rejected() {
        let mut group = WriteGroup::new(0, 2);
        group.set(DocumentRef::new("c/a"), json!({})).unwrap();
        group.delete(DocumentRef::new("c/b")).unwrap();
        assert!(group.is_full());
        assert_eq!(group.headroom(), 0);

        let result = group.delete(DocumentRef::new("c/c"));
        assert!(matches!(
            result,
            Err(BatchError::GroupOverflow { size: 2, limit: 2 })
        ));
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_seal_preserves_order() {
        let mut group = WriteGroup::new(4, 10);
        for i in 0..5 {
            group
                .create(DocumentRef::in_collection("c", &i.to_string()), json!({ "i": i }))
                .unwrap();
        }

        let sealed = group.seal();
        assert_eq!(sealed.index(), 4);
        let ids: Vec<&str> = sealed.operations().iter().map(|op| op.target.id()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_absorb_appends_in_order() {
        let mut open = WriteGroup::new(0, 4);
        open.delete(DocumentRef::new("c/a")).unwrap();

        let mut staged = WriteGroup::new(0, open.headroom());
        staged.delete(DocumentRef::new("c/b")).unwrap();
        staged.delete(DocumentRef::new("c/c")).unwrap();
        open.absorb(staged);

        let ids: Vec<&str> = open.operations().iter().map(|op| op.target.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(open.headroom(), 1);
    }

    #[test]
    fn test_commit_result_helpers() {
        assert!(CommitResult::empty(2).is_noop());
        let result = CommitResult::all_succeeded(1, 3);
        assert!(result.is_success());
        assert_eq!(result.succeeded, 3);
    }
}
