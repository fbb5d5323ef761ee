use async_trait::async_trait;

use crate::metrics::ProgressCounter;
use crate::writer::BoundedBatchWriter;

/// A tagged, runnable migration or backfill.
///
/// Implementations read their working set themselves, feed writes through the
/// provided writer and record domain counts on the counter. They must not call
/// `close()`; the runner closes the writer on every path.
#[async_trait]
pub trait MigrationTask: Send + Sync {
    /// Unique tag used to select the task
    fn tag(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn run(
        &self,
        writer: &mut BoundedBatchWriter,
        counter: &ProgressCounter,
    ) -> anyhow::Result<()>;
}
