use std::sync::Arc;

use docstore_batch::{
    BatchWriterConfig, BoundedBatchWriter, DocumentRef, InMemoryDocumentStore, ProgressCounter,
};
use serde_json::json;

/// Document reference for the `i`-th user
pub fn user(i: usize) -> DocumentRef {
    DocumentRef::in_collection("users", &format!("user-{i:04}"))
}

/// Writer over `store` with a fresh counter
pub fn writer_for(
    store: &InMemoryDocumentStore,
    config: BatchWriterConfig,
) -> (BoundedBatchWriter, Arc<ProgressCounter>) {
    let counter = Arc::new(ProgressCounter::new());
    let writer = BoundedBatchWriter::new(Arc::new(store.clone()), Arc::clone(&counter), config)
        .expect("valid writer config");
    (writer, counter)
}

/// Add one Set per index, each its own `add` call
pub async fn add_sets(writer: &mut BoundedBatchWriter, indices: std::ops::Range<usize>) {
    for i in indices {
        writer
            .add(|group| group.set(user(i), json!({ "seq": i })))
            .await
            .expect("add should succeed");
    }
}
