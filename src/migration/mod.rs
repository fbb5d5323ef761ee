//! # Migrations
//!
//! Tagged migration tasks, the registry that dispatches them and the runner
//! that wires a writer and counter around each run.

pub mod gate;
pub mod registry;
pub mod runner;
pub mod task;

pub use gate::{AutoConfirm, ConfirmationGate, DenyAll, StdinConfirmationGate};
pub use registry::MigrationRegistry;
pub use runner::{MigrationRunner, RunSummary};
pub use task::MigrationTask;
