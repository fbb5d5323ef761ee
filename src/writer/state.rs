use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a batch writer
///
/// ```text
/// Open(n) --add--> Open(n+1)
/// Open(max) --add--> Committing --> Open(0) --> Open(1)
/// Open(n>0) --commit--> Committing --> Open(0)
/// Open(*) --close--> Committing --> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterState {
    /// Accepting operations; holds the pending count of the open group
    Open(usize),
    /// A group has been sealed and is awaiting the store
    Committing,
    /// Terminal; no further operations are accepted
    Closed,
}

impl WriterState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn accepts_operations(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    pub fn pending(&self) -> usize {
        match self {
            Self::Open(pending) => *pending,
            _ => 0,
        }
    }
}

impl Default for WriterState {
    fn default() -> Self {
        Self::Open(0)
    }
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(pending) => write!(f, "open({pending})"),
            Self::Committing => write!(f, "committing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert_eq!(WriterState::default(), WriterState::Open(0));
        assert!(WriterState::Open(3).accepts_operations());
        assert_eq!(WriterState::Open(3).pending(), 3);
        assert!(!WriterState::Committing.accepts_operations());
        assert!(WriterState::Closed.is_terminal());
        assert_eq!(WriterState::Closed.pending(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(WriterState::Open(2).to_string(), "open(2)");
        assert_eq!(WriterState::Committing.to_string(), "committing");
        assert_eq!(WriterState::Closed.to_string(), "closed");
    }
}
