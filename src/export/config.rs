//! Export job configuration.
//!
//! ## Configuration
//!
//! Settings can be overridden via environment variables:
//! - `NETCANVAS_EXPORT_CONCURRENCY`: Maximum concurrent encode tasks (default: 1000)
//! - `NETCANVAS_EXPORT_TMPDIR`: Root for job working directories (default: system temp dir)
//! - `NETCANVAS_EXPORT_BATCH_SIZE`: Entities per GraphML chunk (default: 100)

use std::path::PathBuf;

use crate::encode::DEFAULT_BATCH_SIZE;

/// Default bound on concurrently running encode tasks.
pub const DEFAULT_CONCURRENCY: usize = 1000;

/// Default archive file name.
pub const DEFAULT_ARCHIVE_NAME: &str = "networkCanvasExport.zip";

/// Resource settings for an export job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Maximum concurrent encode tasks (default: 1000).
    pub concurrency: usize,
    /// Directory under which each job creates its working directory.
    pub temp_root: PathBuf,
    /// Entities per GraphML chunk (default: 100).
    pub graphml_batch_size: usize,
    /// File name of the archive inside the working directory.
    pub archive_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            temp_root: std::env::temp_dir(),
            graphml_batch_size: DEFAULT_BATCH_SIZE,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

impl ExportConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            concurrency: std::env::var("NETCANVAS_EXPORT_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.concurrency),
            temp_root: std::env::var("NETCANVAS_EXPORT_TMPDIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_root),
            graphml_batch_size: std::env::var("NETCANVAS_EXPORT_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.graphml_batch_size),
            archive_name: defaults.archive_name,
        }
    }

    /// Builder-style concurrency setter. Values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Builder-style working directory root setter.
    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    /// Builder-style GraphML batch size setter.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.graphml_batch_size = batch_size.max(1);
        self
    }

    /// Builder-style archive name setter.
    pub fn with_archive_name(mut self, archive_name: impl Into<String>) -> Self {
        self.archive_name = archive_name.into();
        self
    }
}
