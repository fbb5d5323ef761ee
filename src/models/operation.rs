//! # Write Operations
//!
//! A single mutation intent against one document, keyed by its path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{BatchError, Result};

/// Slash-separated path identifying a document, e.g. `userData/alice/userGroups/g1`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(String);

impl DocumentRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into().trim_matches('/').to_string())
    }

    /// Build a reference from a collection path and a document id
    pub fn in_collection(collection: &str, id: &str) -> Self {
        Self::new(format!("{}/{}", collection.trim_matches('/'), id))
    }

    /// Reference to a document in a sub-collection of this document
    pub fn child(&self, collection: &str, id: &str) -> Self {
        Self::new(format!("{}/{}/{}", self.0, collection, id))
    }

    pub fn path(&self) -> &str {
        &self.0
    }

    /// Last path segment
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Collection path the document lives in, empty for a bare id
    pub fn collection(&self) -> &str {
        self.0.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Kind of mutation applied to the target document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Write a new document; fails if it already exists
    Create,
    /// Write a document, replacing or merging into any existing one
    Set,
    /// Modify fields of an existing document; fails if it is missing
    Update,
    /// Remove the document
    Delete,
}

impl OperationKind {
    pub fn requires_payload(&self) -> bool {
        !matches!(self, Self::Delete)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Set => write!(f, "set"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Options accepted alongside a set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOptions {
    /// Preserve fields of the existing document that the payload does not name
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// One mutation destined for a write group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOperation {
    pub target: DocumentRef,
    pub kind: OperationKind,
    /// Document data; `None` only for deletes
    pub payload: Option<Value>,
    /// Whether unspecified fields on the target are preserved
    pub merge: bool,
}

impl WriteOperation {
    /// Build an operation, rejecting kind/payload combinations the store cannot apply
    pub fn new(
        target: DocumentRef,
        kind: OperationKind,
        payload: Option<Value>,
        merge: bool,
    ) -> Result<Self> {
        match (&payload, kind.requires_payload()) {
            (None, true) => {
                return Err(BatchError::InvalidOperation {
                    target,
                    reason: format!("{kind} requires a payload"),
                })
            }
            (Some(_), false) => {
                return Err(BatchError::InvalidOperation {
                    target,
                    reason: format!("{kind} does not take a payload"),
                })
            }
            _ => {}
        }

        if kind == OperationKind::Update && !matches!(payload, Some(Value::Object(_))) {
            return Err(BatchError::InvalidOperation {
                target,
                reason: "update payload must be an object of fields".to_string(),
            });
        }

        Ok(Self {
            target,
            kind,
            payload,
            // Update always preserves untouched fields
            merge: merge || kind == OperationKind::Update,
        })
    }

    pub fn create(target: DocumentRef, data: Value) -> Self {
        Self {
            target,
            kind: OperationKind::Create,
            payload: Some(data),
            merge: false,
        }
    }

    pub fn set(target: DocumentRef, data: Value, options: SetOptions) -> Self {
        Self {
            target,
            kind: OperationKind::Set,
            payload: Some(data),
            merge: options.merge,
        }
    }

    pub fn update(target: DocumentRef, fields: Value) -> Result<Self> {
        Self::new(target, OperationKind::Update, Some(fields), true)
    }

    pub fn delete(target: DocumentRef) -> Self {
        Self {
            target,
            kind: OperationKind::Delete,
            payload: None,
            merge: false,
        }
    }
}
