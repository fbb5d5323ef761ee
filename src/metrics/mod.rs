//! # Progress Metrics
//!
//! The counter/progress sidecar consumed by the writer and by migration tasks.

pub mod counter;
pub mod progress;

pub use counter::{CounterSnapshot, ProgressCounter};
pub use progress::ProgressTracker;
