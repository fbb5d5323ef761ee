//! # System Constants
//!
//! Defaults and well-known counter labels shared by the writer, the progress
//! tracker and migration tasks.

/// Writer defaults and hard limits
pub mod system {
    /// Default number of operations per group. Matches the cap the migration
    /// jobs settled on for the atomic batch limit of the backing store.
    pub const DEFAULT_MAX_GROUP_SIZE: usize = 450;

    /// Default progress log granularity, in percent of the expected total
    pub const DEFAULT_PROGRESS_LOG_PERCENT: u8 = 10;

    /// Environment variable prefix for configuration overrides
    pub const CONFIG_ENV_PREFIX: &str = "DOCSTORE_BATCH";

    /// Crate version marker included in run summaries
    pub const DOCSTORE_BATCH_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Labels for the custom counts the writer maintains on a `ProgressCounter`
pub mod counter_keys {
    /// Operations appended to an open group and awaiting commit
    pub const QUEUED_WRITES: &str = "Queued Writes";

    /// Operations the store acknowledged
    pub const SUCCESSFUL_WRITES: &str = "Successful Writes";

    /// Operations the store rejected, individually or as part of a group
    pub const FAILED_WRITES: &str = "Failed Writes";

    /// Groups the store accepted
    pub const GROUPS_COMMITTED: &str = "Groups Committed";

    /// Groups the store rejected as a whole
    pub const FAILED_GROUPS: &str = "Failed Groups";

    /// Size of the working set a migration iterates over
    pub const TOTAL_NUM_DOCS: &str = "Total Documents";

    /// Index of the document a migration is currently processing
    pub const CURRENT_DOC_INDEX: &str = "Current Document Index";
}

/// Environment names recognised by logging and configuration
pub mod environments {
    pub const DEVELOPMENT: &str = "development";
    pub const TEST: &str = "test";
    pub const PRODUCTION: &str = "production";
}
