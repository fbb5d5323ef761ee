//! # Progress Counter
//!
//! Caller-owned tally of reads, writes and free-form labelled counts. A
//! migration creates one, shares it with its writer through an `Arc`, and
//! prints it when the run ends, whatever the outcome.
//!
//! All methods take `&self`; the plain counters are atomics and the labelled
//! counts sit behind a `parking_lot::Mutex`, so one counter may be shared by
//! several writers or tasks.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::constants::counter_keys;

/// Accumulates progress across many calls
#[derive(Debug, Default)]
pub struct ProgressCounter {
    reads: AtomicU64,
    writes: AtomicU64,
    custom_counts: Mutex<BTreeMap<String, u64>>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_read_count(&self, count: u64) {
        self.reads.fetch_add(count, Ordering::Relaxed);
    }

    pub fn read_increment(&self) {
        self.add_to_read_count(1);
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn write_increment(&self) {
        self.add_to_write_count(1);
    }

    pub fn add_to_write_count(&self, count: u64) {
        self.writes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn custom_count_increment(&self, key: &str) {
        self.add_to_custom_count(key, 1);
    }

    pub fn add_to_custom_count(&self, key: &str, count: u64) {
        let mut counts = self.custom_counts.lock();
        *counts.entry(key.to_string()).or_insert(0) += count;
    }

    pub fn set_custom_count(&self, key: &str, count: u64) {
        self.custom_counts.lock().insert(key.to_string(), count);
    }

    /// Current value for a label; labels never touched read as zero
    pub fn get_custom_count(&self, key: &str) -> u64 {
        self.custom_counts.lock().get(key).copied().unwrap_or(0)
    }

    pub fn failed_writes(&self) -> u64 {
        self.get_custom_count(counter_keys::FAILED_WRITES)
    }

    pub fn successful_writes(&self) -> u64 {
        self.get_custom_count(counter_keys::SUCCESSFUL_WRITES)
    }

    /// `part` as a percentage of `whole`; `None` when `whole` is zero
    pub fn percent_of(&self, part: &str, whole: &str) -> Option<f64> {
        let counts = self.custom_counts.lock();
        let whole = counts.get(whole).copied().unwrap_or(0);
        if whole == 0 {
            return None;
        }
        let part = counts.get(part).copied().unwrap_or(0);
        Some(part as f64 / whole as f64 * 100.0)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            reads: self.reads(),
            writes: self.writes(),
            custom_counts: self.custom_counts.lock().clone(),
        }
    }

    /// Log the current tallies and return them as a printable summary
    pub fn print(&self) -> CounterSnapshot {
        let snapshot = self.snapshot();
        info!(
            reads = snapshot.reads,
            writes = snapshot.writes,
            failed_writes = snapshot.custom(counter_keys::FAILED_WRITES),
            "📊 Progress summary"
        );
        for (label, count) in &snapshot.custom_counts {
            info!(label = %label, count = count, "📊 Custom count");
        }
        snapshot
    }
}

/// Point-in-time copy of a counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub custom_counts: BTreeMap<String, u64>,
}

impl CounterSnapshot {
    pub fn custom(&self, key: &str) -> u64 {
        self.custom_counts.get(key).copied().unwrap_or(0)
    }
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-> Reads: {}", self.reads)?;
        writeln!(f, "-> Writes: {}", self.writes)?;
        for (label, count) in &self.custom_counts {
            writeln!(f, "-> {label}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counts_accumulate() {
        let counter = ProgressCounter::new();
        counter.add_to_read_count(10);
        counter.read_increment();
        counter.write_increment();
        counter.add_to_write_count(4);

        assert_eq!(counter.reads(), 11);
        assert_eq!(counter.writes(), 5);
    }

    #[test]
    fn test_custom_counts() {
        let counter = ProgressCounter::new();
        counter.custom_count_increment("Users with Field of Study");
        counter.custom_count_increment("Users with Field of Study");
        counter.add_to_custom_count("Total Users", 8);
        counter.set_custom_count("Current Document Index", 3);
        counter.set_custom_count("Current Document Index", 4);

        assert_eq!(counter.get_custom_count("Users with Field of Study"), 2);
        assert_eq!(counter.get_custom_count("Current Document Index"), 4);
        assert_eq!(counter.get_custom_count("never touched"), 0);
        assert_eq!(
            counter.percent_of("Users with Field of Study", "Total Users"),
            Some(25.0)
        );
        assert_eq!(counter.percent_of("Total Users", "missing"), None);
    }

    #[test]
    fn test_snapshot_display() {
        let counter = ProgressCounter::new();
        counter.add_to_read_count(2);
        counter.custom_count_increment(counter_keys::FAILED_WRITES);

        let snapshot = counter.print();
        let rendered = snapshot.to_string();
        assert!(rendered.contains("-> Reads: 2"));
        assert!(rendered.contains("-> Writes: 0"));
        assert!(rendered.contains("-> Failed Writes: 1"));
        assert_eq!(counter.failed_writes(), 1);
    }

    #[test]
    fn test_shared_between_threads() {
        let counter = Arc::new(ProgressCounter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        counter.write_increment();
                        counter.custom_count_increment("ticks");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.writes(), 1000);
        assert_eq!(counter.get_custom_count("ticks"), 1000);
    }
}
