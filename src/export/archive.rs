//! Zip archiving of encoded files.

use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::cancel::CancelToken;

/// Errors from writing an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading a source file or writing the archive failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip writer failed.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A source path has no file name.
    #[error("invalid source path: {0}")]
    InvalidSource(PathBuf),

    /// The archiving task panicked.
    #[error("archive task failed: {0}")]
    Task(String),

    /// Cancellation was requested before every file was archived.
    #[error("archiving cancelled")]
    Cancelled,
}

/// Callback receiving archive progress as a 0-100 percentage.
pub type ArchiveProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Bundles encoded files into one archive.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Write `sources` into an archive at `destination`, reporting progress.
    ///
    /// Implementations stop with [`ArchiveError::Cancelled`] once `cancel`
    /// fires and leave no partial archive behind.
    async fn archive(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        on_progress: ArchiveProgressFn,
        cancel: &CancelToken,
    ) -> Result<PathBuf, ArchiveError>;
}

/// Deflate zip archive with every file at the archive root.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

fn write_zip(
    sources: &[PathBuf],
    destination: &Path,
    on_progress: &dyn Fn(f64),
    cancel: &CancelToken,
) -> Result<(), ArchiveError> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(destination)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (i, source) in sources.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ArchiveError::InvalidSource(source.clone()))?;
        zip.start_file(name, options)?;
        let mut input = File::open(source)?;
        std::io::copy(&mut input, &mut zip)?;
        on_progress(100.0 * (i + 1) as f64 / sources.len() as f64);
    }

    zip.finish()?.flush()?;
    Ok(())
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        on_progress: ArchiveProgressFn,
        cancel: &CancelToken,
    ) -> Result<PathBuf, ArchiveError> {
        let sources = sources.to_vec();
        let destination = destination.to_path_buf();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            match write_zip(&sources, &destination, on_progress.as_ref(), &cancel) {
                Ok(()) => Ok(destination),
                Err(err) => {
                    let _ = std::fs::remove_file(&destination);
                    Err(err)
                }
            }
        })
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))?
    }
}
