//! Job results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::canonical::canonical_hash_hex;
use crate::pipeline::SkippedSession;
use crate::types::ExportFormat;

/// A file that was encoded and archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFile {
    /// File name inside the archive.
    pub file_name: String,
    /// Encoded format.
    pub format: ExportFormat,
    /// Partition label, when the format splits by type.
    pub partition: Option<String>,
    /// Size in bytes.
    pub bytes: u64,
    /// SHA-256 of the file contents, lowercase hex.
    pub sha256: String,
}

/// An encode task that failed; its file is not in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTask {
    /// File name the task would have written.
    pub file_name: String,
    /// Format being encoded.
    pub format: ExportFormat,
    /// Partition label.
    pub partition: Option<String>,
    /// Failure description.
    pub message: String,
}

/// Summary of a completed export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    /// Where the save target put the archive.
    pub archive_path: PathBuf,
    /// Archived files, sorted by file name.
    pub files: Vec<ExportedFile>,
    /// Failed encode tasks, sorted by file name.
    pub failed: Vec<FailedTask>,
    /// Sessions rejected by validation.
    pub skipped: Vec<SkippedSession>,
    /// xxh64 over the archived file list; identical inputs give identical
    /// fingerprints.
    pub fingerprint: String,
    /// When the job completed.
    pub completed_at: DateTime<Utc>,
}

impl ExportReport {
    /// Build a report, sorting file lists and computing the fingerprint.
    pub fn new(
        archive_path: PathBuf,
        mut files: Vec<ExportedFile>,
        mut failed: Vec<FailedTask>,
        skipped: Vec<SkippedSession>,
    ) -> Self {
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        failed.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        let fingerprint = canonical_hash_hex(&files);
        Self {
            archive_path,
            files,
            failed,
            skipped,
            fingerprint,
            completed_at: Utc::now(),
        }
    }

    /// Look up an archived file by name.
    pub fn file(&self, file_name: &str) -> Option<&ExportedFile> {
        self.files.iter().find(|f| f.file_name == file_name)
    }

    /// Archived file names, sorted.
    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.file_name.as_str()).collect()
    }
}

/// How an export job resolved when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// The archive was produced and saved.
    Completed(ExportReport),
    /// The job was aborted or the save was declined.
    Cancelled,
}

impl ExportOutcome {
    /// The report, if the job completed.
    pub fn report(&self) -> Option<&ExportReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Cancelled => None,
        }
    }

    /// Whether the job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
