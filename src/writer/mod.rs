//! # Batch Writer
//!
//! The bounded write coordinator and its supporting lifecycle and outcome types.

pub mod bounded_writer;
pub mod handler;
pub mod state;

pub use bounded_writer::BoundedBatchWriter;
pub use handler::{LoggingResultHandler, RecordingResultHandler, WriteResultHandler};
pub use state::WriterState;
