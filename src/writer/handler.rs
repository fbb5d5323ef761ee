//! Per-operation outcome hooks for best-effort mode.
//!
//! The writer always tallies outcomes on its `ProgressCounter`; a handler adds
//! caller-specific reactions such as logging or collecting failed targets for
//! a follow-up run.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{DocumentRef, OperationFailure, WriteOperation};
use crate::store::WriteReceipt;

/// Observes the outcome of each best-effort write
pub trait WriteResultHandler: Send + Sync {
    fn on_success(&self, _receipt: &WriteReceipt) {}

    fn on_failure(&self, _operation: &WriteOperation, _error: &StoreError) {}
}

/// Logs failures at warn level and successes at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingResultHandler;

impl WriteResultHandler for LoggingResultHandler {
    fn on_success(&self, receipt: &WriteReceipt) {
        debug!(target_doc = %receipt.target, kind = %receipt.kind, "Write acknowledged");
    }

    fn on_failure(&self, operation: &WriteOperation, error: &StoreError) {
        warn!(
            target_doc = %operation.target,
            kind = %operation.kind,
            error = %error,
            "⚠️ Write rejected"
        );
    }
}

/// Collects outcomes in arrival order
#[derive(Debug, Default)]
pub struct RecordingResultHandler {
    successes: Mutex<Vec<DocumentRef>>,
    failures: Mutex<Vec<OperationFailure>>,
}

impl RecordingResultHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn successes(&self) -> Vec<DocumentRef> {
        self.successes.lock().clone()
    }

    pub fn failures(&self) -> Vec<OperationFailure> {
        self.failures.lock().clone()
    }
}

impl WriteResultHandler for RecordingResultHandler {
    fn on_success(&self, receipt: &WriteReceipt) {
        self.successes.lock().push(receipt.target.clone());
    }

    fn on_failure(&self, operation: &WriteOperation, error: &StoreError) {
        self.failures
            .lock()
            .push(OperationFailure::new(operation.target.clone(), error));
    }
}
