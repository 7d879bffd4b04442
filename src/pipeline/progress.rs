//! Progress tracking for pipeline runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A progress update event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// A run has started.
    Started {
        total_steps: usize,
    },
    /// A step has started processing.
    StepStarted {
        index: usize,
        step: String,
        total: usize,
    },
    /// A step has completed processing.
    StepCompleted {
        index: usize,
        step: String,
        duration_ms: u64,
        total: usize,
    },
    /// The run has completed.
    Completed {
        total_duration_ms: u64,
        steps_executed: usize,
    },
    /// A step failed and the run stopped.
    Failed {
        index: usize,
        step: String,
        message: String,
    },
}

/// Callback type for progress updates.
///
/// Shared so the same callback can observe several runs at once; it must
/// tolerate being called from multiple threads.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Tracks the progress of a single run.
pub struct ProgressTracker {
    /// Total number of steps to run.
    total_steps: usize,
    /// Number of steps completed.
    completed_steps: usize,
    /// Start time.
    start_time: Option<Instant>,
    /// Progress callback.
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps,
            completed_steps: 0,
            start_time: None,
            callback: None,
        }
    }

    /// Set a callback for progress updates.
    pub fn with_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// Start tracking.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.send_update(ProgressUpdate::Started {
            total_steps: self.total_steps,
        });
    }

    /// Report that a step has started.
    pub fn step_started(&self, index: usize, step: &str) {
        self.send_update(ProgressUpdate::StepStarted {
            index,
            step: step.to_string(),
            total: self.total_steps,
        });
    }

    /// Report that a step has completed.
    pub fn step_completed(&mut self, index: usize, step: &str, duration: Duration) {
        self.completed_steps += 1;
        self.send_update(ProgressUpdate::StepCompleted {
            index,
            step: step.to_string(),
            duration_ms: duration.as_millis() as u64,
            total: self.total_steps,
        });
    }

    /// Report a failure.
    pub fn failed(&self, index: usize, step: &str, message: String) {
        self.send_update(ProgressUpdate::Failed {
            index,
            step: step.to_string(),
            message,
        });
    }

    /// Complete tracking.
    pub fn complete(&self) {
        self.send_update(ProgressUpdate::Completed {
            total_duration_ms: self.elapsed().as_millis() as u64,
            steps_executed: self.completed_steps,
        });
    }

    /// Time since `start`.
    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Get current progress percentage.
    pub fn progress_percent(&self) -> f32 {
        if self.total_steps == 0 {
            return 100.0;
        }
        (self.completed_steps as f32 / self.total_steps as f32) * 100.0
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(callback) = &self.callback {
            callback(update);
        }
    }
}
