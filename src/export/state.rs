//! Export job lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an export job.
///
/// ```text
/// Idle → Preparing → Transforming → Encoding → Archiving → Saving → Finished
///   └──────────────────────┴─────────────┴──────────┴─────────┴──→ Aborted | Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, not started.
    Idle,
    /// Validating inputs and creating the working directory.
    Preparing,
    /// Running the transformation pipeline.
    Transforming,
    /// Running encode tasks.
    Encoding,
    /// Writing the archive.
    Archiving,
    /// Handing the archive to the save target.
    Saving,
    /// Completed successfully.
    Finished,
    /// Cancelled by the caller or declined at save.
    Aborted,
    /// Stopped by a fatal error.
    Failed,
}

impl JobState {
    /// Whether the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Aborted | Self::Failed)
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Transforming => "transforming",
            Self::Encoding => "encoding",
            Self::Archiving => "archiving",
            Self::Saving => "saving",
            Self::Finished => "finished",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
