//! # Progress Tracker
//!
//! Log-line progress reporting for long loops and write phases. Emits one
//! `info!` line each time completion crosses another configured percentage
//! step, plus a final line on `stop()`.

use std::time::Instant;
use tracing::{debug, info};

/// Tracks completion of a known-size piece of work
#[derive(Debug)]
pub struct ProgressTracker {
    label: String,
    total: u64,
    current: u64,
    step_percent: u8,
    last_logged_step: u64,
    started_at: Option<Instant>,
}

impl ProgressTracker {
    /// `step_percent` is clamped to 1..=100
    pub fn new(label: impl Into<String>, step_percent: u8) -> Self {
        Self {
            label: label.into(),
            total: 0,
            current: 0,
            step_percent: step_percent.clamp(1, 100),
            last_logged_step: 0,
            started_at: None,
        }
    }

    pub fn start(&mut self, total: u64, current: u64) {
        self.total = total;
        self.current = current.min(total);
        self.last_logged_step = self.step_of(self.current);
        self.started_at = Some(Instant::now());
        info!(label = %self.label, total = total, current = self.current, "⏳ Progress started");
    }

    pub fn update(&mut self, current: u64) {
        self.current = current.min(self.total);
        let step = self.step_of(self.current);
        if step > self.last_logged_step {
            self.last_logged_step = step;
            info!(
                label = %self.label,
                current = self.current,
                total = self.total,
                percent = %format!("{:.0}", self.percent()),
                "⏳ Progress"
            );
        }
    }

    pub fn increment(&mut self) {
        self.update(self.current.saturating_add(1));
    }

    /// Grow the expected total, e.g. when a writer learns of more queued work
    pub fn set_total(&mut self, total: u64) {
        self.total = total;
        self.last_logged_step = self.step_of(self.current);
    }

    pub fn stop(&mut self) {
        let elapsed_ms = self
            .started_at
            .take()
            .map(|started| started.elapsed().as_millis())
            .unwrap_or_default();
        info!(
            label = %self.label,
            current = self.current,
            total = self.total,
            elapsed_ms = elapsed_ms,
            "✅ Progress finished"
        );
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.current as f64 / self.total as f64 * 100.0
    }

    /// Number of completed steps reached so far
    pub fn logged_steps(&self) -> u64 {
        self.last_logged_step
    }

    fn step_of(&self, current: u64) -> u64 {
        if self.total == 0 {
            debug!(label = %self.label, "Progress total is zero");
            return 0;
        }
        current * 100 / self.total / u64::from(self.step_percent)
    }
}
