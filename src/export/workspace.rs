//! Per-job temporary working directory.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of every job working directory.
pub const WORKSPACE_PREFIX: &str = "org.codaco.exporting";

/// A uniquely named directory holding one job's encoded files and archive.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Create `{root}/org.codaco.exporting.{uuid}`.
    pub async fn create(root: &Path) -> std::io::Result<Self> {
        let path = root.join(format!("{WORKSPACE_PREFIX}.{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        debug!(path = %path.display(), "Created export workspace");
        Ok(Self { path })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the directory and everything in it.
    ///
    /// Failures are logged, not returned: cleanup runs on every exit path
    /// and must not mask the job's own outcome.
    pub async fn remove(self) {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Removed export workspace"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), error = %err, "Failed to remove export workspace"),
        }
    }
}
