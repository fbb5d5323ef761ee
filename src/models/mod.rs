//! # Data Model
//!
//! Operations, groups and commit outcomes shared by the writer and the stores.

pub mod group;
pub mod operation;

pub use group::{CommitResult, OperationFailure, SealedGroup, WriteGroup};
pub use operation::{DocumentRef, OperationKind, SetOptions, WriteOperation};
