//! # Batch Writer Configuration
//!
//! Settings that control how a [`BoundedBatchWriter`](crate::writer::BoundedBatchWriter)
//! groups and submits operations. Values come from, in increasing precedence:
//!
//! 1. Built-in defaults ([`BatchWriterConfig::default`])
//! 2. `config/docstore-batch.toml`
//! 3. `config/docstore-batch.<environment>.toml`
//! 4. `DOCSTORE_BATCH__*` environment variables
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docstore_batch::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load()?;
//! println!("max group size: {}", config.max_group_size);
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::constants::system;
use crate::error::ConfigurationError;

pub use loader::ConfigLoader;

/// How groups reach the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Each group is one all-or-nothing batch commit
    #[default]
    Atomic,
    /// Each operation is written independently; groups only pace flushes
    BestEffort,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atomic => write!(f, "atomic"),
            Self::BestEffort => write!(f, "best_effort"),
        }
    }
}

/// Writer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchWriterConfig {
    /// Maximum operations per group; the atomic batch limit in atomic mode
    pub max_group_size: usize,
    /// Run every step except the store mutation
    pub dry_run: bool,
    pub mode: WriteMode,
    /// Pause after each best-effort flush, to stay under store rate limits
    pub flush_pause_ms: u64,
    /// Log write progress each time this percentage of the expected total completes
    pub progress_log_percent: u8,
    /// Target is production; runners must pass the confirmation gate first
    pub production: bool,
}

impl Default for BatchWriterConfig {
    fn default() -> Self {
        Self {
            max_group_size: system::DEFAULT_MAX_GROUP_SIZE,
            dry_run: false,
            mode: WriteMode::Atomic,
            flush_pause_ms: 0,
            progress_log_percent: system::DEFAULT_PROGRESS_LOG_PERCENT,
            production: false,
        }
    }
}

impl BatchWriterConfig {
    pub fn atomic(max_group_size: usize) -> Self {
        Self {
            max_group_size,
            ..Self::default()
        }
    }

    pub fn best_effort(max_group_size: usize) -> Self {
        Self {
            max_group_size,
            mode: WriteMode::BestEffort,
            ..Self::default()
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_flush_pause(mut self, pause: Duration) -> Self {
        self.flush_pause_ms = pause.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn flush_pause(&self) -> Duration {
        Duration::from_millis(self.flush_pause_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_group_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "max_group_size",
                self.max_group_size,
                "must be at least 1",
            ));
        }
        if !(1..=100).contains(&self.progress_log_percent) {
            return Err(ConfigurationError::invalid_value(
                "progress_log_percent",
                self.progress_log_percent,
                "must be between 1 and 100",
            ));
        }
        Ok(())
    }
}
