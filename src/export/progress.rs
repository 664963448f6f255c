//! Progress reporting.
//!
//! Each milestone carries a 0-100 completion estimate. The tracker clamps
//! estimates so reported percentages never decrease, even when task
//! completions and diagnostics interleave.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A progress milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Job started.
    Begin,
    /// Ego-stamping and resequencing.
    Formatting,
    /// Merging sessions by protocol.
    Merging,
    /// A network's first file was written.
    SessionExported {
        /// Networks exported so far.
        count: usize,
        /// Networks to export.
        total: usize,
    },
    /// Archive creation started.
    ArchiveStart,
    /// Archive creation progress.
    ArchiveProgress {
        /// Share of files archived, 0-100.
        percent: f64,
    },
    /// Handing the archive to the save target.
    Saving,
    /// Job finished.
    Finished,
    /// Job cancelled.
    Cancelled,
    /// An encode task failed; the job continues.
    TaskFailed {
        /// Failure description.
        message: String,
    },
}

impl ProgressEvent {
    /// Nominal completion estimate; `None` for events that keep the current value.
    pub fn nominal_percent(&self) -> Option<f64> {
        match self {
            Self::Begin => Some(0.0),
            Self::Formatting => Some(10.0),
            Self::Merging => Some(20.0),
            Self::SessionExported { count, total } => {
                let share = if *total == 0 {
                    1.0
                } else {
                    (*count as f64 / *total as f64).min(1.0)
                };
                Some(30.0 + 20.0 * share)
            }
            Self::ArchiveStart => Some(60.0),
            Self::ArchiveProgress { percent } => Some(60.0 + 25.0 * percent.clamp(0.0, 100.0) / 100.0),
            Self::Saving => Some(90.0),
            Self::Finished => Some(100.0),
            Self::Cancelled | Self::TaskFailed { .. } => None,
        }
    }

    /// Human-readable status line.
    pub fn status_text(&self) -> String {
        match self {
            Self::Begin => "Starting export...".to_string(),
            Self::Formatting => "Formatting network data...".to_string(),
            Self::Merging => "Merging sessions by protocol...".to_string(),
            Self::SessionExported { count, total } => {
                format!("Exporting {count} of {total} sessions...")
            }
            Self::ArchiveStart => "Creating zip archive...".to_string(),
            Self::ArchiveProgress { .. } => "Zipping files...".to_string(),
            Self::Saving => "Saving file...".to_string(),
            Self::Finished => "Export finished.".to_string(),
            Self::Cancelled => "Export cancelled.".to_string(),
            Self::TaskFailed { message } => message.clone(),
        }
    }
}

/// A milestone with its clamped completion estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// The milestone.
    pub event: ProgressEvent,
    /// Completion estimate, 0-100, never decreasing within a job.
    pub percent: f64,
}

/// Receives progress from a running job.
///
/// Called from encode tasks concurrently; implementations must be cheap
/// and must not block.
pub trait ProgressReporter: Send + Sync {
    /// Handle one progress update.
    fn report(&self, progress: &Progress);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    fn report(&self, _progress: &Progress) {
        // No-op
    }
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, progress: &Progress) {
        match &progress.event {
            ProgressEvent::TaskFailed { message } => {
                warn!(percent = progress.percent, error = %message, "Export task failed")
            }
            event => info!(percent = progress.percent, "{}", event.status_text()),
        }
    }
}

/// Records progress for inspection in tests.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<Progress>>,
}

impl RecordingProgress {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<Progress> {
        self.events.lock().clone()
    }

    /// Recorded percentages, in order.
    pub fn percents(&self) -> Vec<f64> {
        self.events.lock().iter().map(|p| p.percent).collect()
    }

    /// Whether an event matching the predicate was recorded.
    pub fn contains(&self, predicate: impl Fn(&ProgressEvent) -> bool) -> bool {
        self.events.lock().iter().any(|p| predicate(&p.event))
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, progress: &Progress) {
        self.events.lock().push(progress.clone());
    }
}

/// Applies the never-decreasing rule in front of a reporter.
pub(crate) struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    current: Mutex<f64>,
}

impl ProgressTracker {
    pub(crate) fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            current: Mutex::new(0.0),
        }
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        // Hold the lock while reporting so concurrent emits arrive in order.
        let mut current = self.current.lock();
        if let Some(nominal) = event.nominal_percent() {
            *current = current.max(nominal);
        }
        let progress = Progress {
            event,
            percent: *current,
        };
        self.reporter.report(&progress);
    }
}
