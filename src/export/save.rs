//! Delivery of the finished archive.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result of handing an archive to a save target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The archive was saved at this path.
    Saved(PathBuf),
    /// The user declined to save (for example, dismissed a dialog).
    Declined,
}

/// Destination for a finished archive.
///
/// The archive lives in the job's working directory, which is removed after
/// `save` returns; implementations must copy or move it out.
#[async_trait]
pub trait SaveTarget: Send + Sync {
    /// Save the archive at `archive`.
    async fn save(&self, archive: &Path) -> std::io::Result<SaveOutcome>;
}

/// Copies the archive to a fixed path, creating parent directories.
#[derive(Debug, Clone)]
pub struct CopyToPath {
    destination: PathBuf,
}

impl CopyToPath {
    /// Save to `destination`.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    /// Destination path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

#[async_trait]
impl SaveTarget for CopyToPath {
    async fn save(&self, archive: &Path) -> std::io::Result<SaveOutcome> {
        if let Some(parent) = self.destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::copy(archive, &self.destination).await?;
        Ok(SaveOutcome::Saved(self.destination.clone()))
    }
}
