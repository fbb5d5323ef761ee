use docstore_batch::{DocumentRef, OperationKind, WriteMode, WriteOperation};
use proptest::prelude::*;
use serde_json::json;

/// Strategy for group size caps, including the degenerate cap of one
pub fn max_group_size_strategy() -> impl Strategy<Value = usize> {
    1usize..=25
}

/// Strategy for the number of operations a run produces
pub fn operation_count_strategy() -> impl Strategy<Value = usize> {
    0usize..=120
}

pub fn write_mode_strategy() -> impl Strategy<Value = WriteMode> {
    prop_oneof![Just(WriteMode::Atomic), Just(WriteMode::BestEffort)]
}

pub fn operation_kind_strategy() -> impl Strategy<Value = OperationKind> {
    prop_oneof![3 => Just(OperationKind::Set), 1 => Just(OperationKind::Delete)]
}

/// Operation on a unique target; both kinds succeed whether or not the document exists
pub fn operation_for(index: usize, kind: OperationKind) -> WriteOperation {
    let target = DocumentRef::in_collection("props", &format!("doc-{index:05}"));
    match kind {
        OperationKind::Delete => WriteOperation::delete(target),
        _ => WriteOperation::set(target, json!({ "seq": index }), Default::default()),
    }
}

/// Strategy for a sequence of operation kinds
pub fn operation_kinds_strategy() -> impl Strategy<Value = Vec<OperationKind>> {
    prop::collection::vec(operation_kind_strategy(), 0..=120)
}
