//! Export orchestration.
//!
//! A [`FileExportManager`] turns sessions, protocols and options into an
//! [`ExportJob`]. Running the job transforms the sessions, fans encode tasks
//! out through a bounded-concurrency queue, archives the successful files
//! and hands the archive to a [`SaveTarget`].
//!
//! ## Failure model
//!
//! - Missing inputs, a missing protocol, an unusable working directory, zero
//!   encoded files, and archive or save errors fail the job.
//! - Invalid sessions are skipped and listed in the report.
//! - Encode task failures are listed in the report and excluded from the
//!   archive.
//! - Cancellation resolves as [`ExportOutcome::Cancelled`], never as an error.
//!
//! The working directory is removed on every exit path.

pub mod config;
pub mod state;
pub mod progress;
pub mod naming;
pub mod workspace;
pub mod archive;
pub mod save;
pub mod report;
mod task;

pub use config::ExportConfig;
pub use state::JobState;
pub use progress::{
    NoOpProgress, Progress, ProgressEvent, ProgressReporter, RecordingProgress, TracingProgress,
};
pub use workspace::Workspace;
pub use archive::{ArchiveError, ArchiveProgressFn, Archiver, ZipArchiver};
pub use save::{CopyToPath, SaveOutcome, SaveTarget};
pub use report::{ExportOutcome, ExportReport, ExportedFile, FailedTask};

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cancel::{CancelToken, Cancelled};
use crate::encode::EncodeSettings;
use crate::pipeline::{self, partition_network, ProtocolNetworks};
use crate::types::{ExportOptions, Protocol, Session};

use naming::{make_filename, protocol_prefix, session_prefix, UniqueNames};
use progress::ProgressTracker;
use task::{EncodeTask, TaskOutput};

/// Fatal export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Sessions or protocols were not supplied.
    #[error("missing parameters: {0}")]
    MissingParameters(&'static str),

    /// A session names a protocol that was not supplied.
    #[error("no protocol supplied for protocol id {0}")]
    MissingProtocol(String),

    /// The working directory could not be created.
    #[error("could not create working directory: {0}")]
    TempDirectory(#[source] std::io::Error),

    /// No file was encoded successfully.
    #[error("nothing to export")]
    NothingToExport,

    /// The archive could not be written.
    #[error("archive failed: {0}")]
    Archive(#[from] ArchiveError),

    /// The save target failed.
    #[error("save failed: {0}")]
    Save(#[source] std::io::Error),
}

/// Why a running job stopped early.
enum Interrupt {
    Cancelled,
    Failed(ExportError),
}

impl From<Cancelled> for Interrupt {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<ExportError> for Interrupt {
    fn from(err: ExportError) -> Self {
        Self::Failed(err)
    }
}

/// Creates export jobs.
pub struct FileExportManager {
    options: ExportOptions,
    config: ExportConfig,
    progress: Arc<dyn ProgressReporter>,
    archiver: Arc<dyn Archiver>,
}

impl FileExportManager {
    /// Create a manager with default config, no progress reporting and zip archiving.
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            config: ExportConfig::default(),
            progress: Arc::new(NoOpProgress),
            archiver: Arc::new(ZipArchiver),
        }
    }

    /// Builder-style config setter.
    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder-style progress reporter setter.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Builder-style archiver setter.
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Export options.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Check inputs and create a job. Nothing runs until [`ExportJob::run`].
    ///
    /// Fails fast when sessions or protocols are empty, or when a session
    /// names a protocol id not present in `protocols`.
    pub fn prepare_export_job(
        &self,
        sessions: Vec<Session>,
        protocols: BTreeMap<String, Protocol>,
        save: Arc<dyn SaveTarget>,
    ) -> Result<ExportJob, ExportError> {
        if sessions.is_empty() {
            return Err(ExportError::MissingParameters("sessions"));
        }
        if protocols.is_empty() {
            return Err(ExportError::MissingParameters("protocols"));
        }
        for session in &sessions {
            if let Some(uid) = session.session_variables.protocol_uid.as_deref() {
                if !uid.is_empty() && !protocols.contains_key(uid) {
                    return Err(ExportError::MissingProtocol(uid.to_string()));
                }
            }
        }

        Ok(ExportJob {
            sessions,
            protocols: protocols
                .into_iter()
                .map(|(uid, protocol)| (uid, Arc::new(protocol)))
                .collect(),
            options: self.options.clone(),
            config: self.config.clone(),
            save,
            archiver: Arc::clone(&self.archiver),
            progress: Arc::new(ProgressTracker::new(Arc::clone(&self.progress))),
            cancel: CancelToken::new(),
            state: Arc::new(RwLock::new(JobState::Idle)),
        })
    }

    /// Prepare and run a job in one call.
    pub async fn export_sessions(
        &self,
        sessions: Vec<Session>,
        protocols: BTreeMap<String, Protocol>,
        save: Arc<dyn SaveTarget>,
    ) -> Result<ExportOutcome, ExportError> {
        self.prepare_export_job(sessions, protocols, save)?.run().await
    }
}

/// Aborts a running job from elsewhere.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    cancel: CancelToken,
    state: Arc<RwLock<JobState>>,
}

impl AbortHandle {
    /// Request cancellation. The job resolves as cancelled once in-flight
    /// tasks have stopped and the working directory is removed.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Current job state.
    pub fn state(&self) -> JobState {
        *self.state.read()
    }
}

/// A prepared export job.
pub struct ExportJob {
    sessions: Vec<Session>,
    protocols: BTreeMap<String, Arc<Protocol>>,
    options: ExportOptions,
    config: ExportConfig,
    save: Arc<dyn SaveTarget>,
    archiver: Arc<dyn Archiver>,
    progress: Arc<ProgressTracker>,
    cancel: CancelToken,
    state: Arc<RwLock<JobState>>,
}

impl ExportJob {
    /// Handle that aborts this job.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            cancel: self.cancel.clone(),
            state: Arc::clone(&self.state),
        }
    }

    /// Current job state.
    pub fn state(&self) -> JobState {
        *self.state.read()
    }

    fn set_state(&self, state: JobState) {
        debug!(state = %state, "Export job state");
        *self.state.write() = state;
    }

    /// Run the job to completion, cancellation or failure.
    pub async fn run(self) -> Result<ExportOutcome, ExportError> {
        let span = info_span!(
            "export_job",
            sessions = self.sessions.len(),
            protocols = self.protocols.len(),
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> Result<ExportOutcome, ExportError> {
        self.progress.emit(ProgressEvent::Begin);
        self.set_state(JobState::Preparing);
        info!(formats = ?self.options.formats(), "Starting export");

        let workspace = match Workspace::create(&self.config.temp_root).await {
            Ok(workspace) => workspace,
            Err(err) => {
                error!(error = %err, "Failed to create working directory");
                self.set_state(JobState::Failed);
                return Err(ExportError::TempDirectory(err));
            }
        };

        let result = self.execute(&workspace).await;
        workspace.remove().await;

        match result {
            Ok(report) => {
                self.set_state(JobState::Finished);
                self.progress.emit(ProgressEvent::Finished);
                info!(
                    files = report.files.len(),
                    failed = report.failed.len(),
                    skipped = report.skipped.len(),
                    fingerprint = %report.fingerprint,
                    "Export finished"
                );
                Ok(ExportOutcome::Completed(report))
            }
            Err(Interrupt::Cancelled) => {
                self.set_state(JobState::Aborted);
                self.progress.emit(ProgressEvent::Cancelled);
                info!("Export cancelled");
                Ok(ExportOutcome::Cancelled)
            }
            Err(Interrupt::Failed(err)) => {
                self.set_state(JobState::Failed);
                error!(error = %err, "Export failed");
                Err(err)
            }
        }
    }

    async fn execute(&self, workspace: &Workspace) -> Result<ExportReport, Interrupt> {
        self.cancel.check()?;
        self.set_state(JobState::Transforming);
        self.progress.emit(ProgressEvent::Formatting);

        let mut prepared = pipeline::prepare_sessions(&self.sessions, &self.cancel)?;
        if self.options.global_options.unify_networks {
            self.cancel.check()?;
            self.progress.emit(ProgressEvent::Merging);
            prepared.networks = pipeline::unify_protocols(prepared.networks);
        }
        let total = prepared.network_count();
        let tasks = self.plan_tasks(prepared.networks, workspace)?;
        info!(networks = total, tasks = tasks.len(), "Encoding");

        self.cancel.check()?;
        self.set_state(JobState::Encoding);
        let outputs = self.run_queue(tasks, total).await?;

        let mut files = Vec::new();
        let mut sources = Vec::new();
        let mut failed = Vec::new();
        for output in outputs {
            match output.result {
                Ok(written) => {
                    sources.push(written.path);
                    files.push(ExportedFile {
                        file_name: output.file_name,
                        format: output.format,
                        partition: output.partition,
                        bytes: written.bytes,
                        sha256: written.sha256,
                    });
                }
                Err(err) => failed.push(FailedTask {
                    file_name: output.file_name,
                    format: output.format,
                    partition: output.partition,
                    message: err.to_string(),
                }),
            }
        }
        if files.is_empty() {
            return Err(ExportError::NothingToExport.into());
        }
        sources.sort();

        self.cancel.check()?;
        self.set_state(JobState::Archiving);
        self.progress.emit(ProgressEvent::ArchiveStart);
        let on_progress: ArchiveProgressFn = {
            let progress = Arc::clone(&self.progress);
            Arc::new(move |percent| progress.emit(ProgressEvent::ArchiveProgress { percent }))
        };
        let destination = workspace.file(&self.config.archive_name);
        let archived = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Interrupt::Cancelled),
            archived = self.archiver.archive(&sources, &destination, on_progress, &self.cancel) => {
                match archived {
                    Ok(path) => path,
                    Err(ArchiveError::Cancelled) => return Err(Interrupt::Cancelled),
                    Err(err) => return Err(ExportError::from(err).into()),
                }
            }
        };

        self.cancel.check()?;
        self.set_state(JobState::Saving);
        self.progress.emit(ProgressEvent::Saving);
        let saved = match self.save.save(&archived).await.map_err(ExportError::Save)? {
            SaveOutcome::Saved(path) => path,
            SaveOutcome::Declined => {
                info!("Save declined");
                return Err(Interrupt::Cancelled);
            }
        };

        Ok(ExportReport::new(saved, files, failed, prepared.skipped))
    }

    /// One task per network, format and partition, each with a unique file name.
    fn plan_tasks(
        &self,
        networks: ProtocolNetworks,
        workspace: &Workspace,
    ) -> Result<Vec<EncodeTask>, ExportError> {
        let formats = self.options.formats();
        let mut names = UniqueNames::new();
        let mut tasks = Vec::new();
        let mut index = 0;

        for (protocol_uid, networks) in networks {
            let protocol = self
                .protocols
                .get(&protocol_uid)
                .cloned()
                .ok_or_else(|| ExportError::MissingProtocol(protocol_uid.clone()))?;

            for network in networks {
                let network = Arc::new(network);
                let prefix = match network.session() {
                    Some(record) => session_prefix(
                        record.variables.case_id.as_deref().unwrap_or_default(),
                        record.session_id(),
                    ),
                    None => protocol_prefix(&protocol.name),
                };

                for &format in &formats {
                    for partition in partition_network(&protocol.codebook, &network, format) {
                        let file_name =
                            names.reserve(make_filename(&prefix, partition.label.as_deref(), format));
                        tasks.push(EncodeTask {
                            network: index,
                            path: workspace.file(&file_name),
                            file_name,
                            format,
                            partition,
                            protocol: Arc::clone(&protocol),
                        });
                    }
                }
                index += 1;
            }
        }
        Ok(tasks)
    }

    /// Run tasks through the bounded queue and collect every result.
    ///
    /// On cancellation no further tasks start; in-flight tasks stop at their
    /// next chunk and are awaited before returning.
    async fn run_queue(&self, tasks: Vec<EncodeTask>, total: usize) -> Result<Vec<TaskOutput>, Interrupt> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let settings = Arc::new(EncodeSettings::from_options(
            &self.options,
            self.config.graphml_batch_size,
        ));
        let mut pending = tasks.into_iter().peekable();
        let mut set: JoinSet<TaskOutput> = JoinSet::new();
        let mut outputs = Vec::new();
        let mut exported: HashSet<usize> = HashSet::new();

        loop {
            if set.is_empty() && pending.peek().is_none() {
                break;
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    while set.join_next().await.is_some() {}
                    return Err(Interrupt::Cancelled);
                }
                Some(joined) = set.join_next(), if !set.is_empty() => {
                    let output = match joined {
                        Ok(output) => output,
                        Err(err) => {
                            error!(error = %err, "Encode task panicked");
                            continue;
                        }
                    };
                    match &output.result {
                        Ok(_) => {
                            if exported.insert(output.network) {
                                self.progress.emit(ProgressEvent::SessionExported {
                                    count: exported.len(),
                                    total,
                                });
                            }
                        }
                        Err(err) => {
                            let message = format!("Encoding {} failed: {err}", output.file_name);
                            warn!(file = %output.file_name, error = %err, "Encode task failed");
                            self.progress.emit(ProgressEvent::TaskFailed { message });
                        }
                    }
                    outputs.push(output);
                }
                permit = Arc::clone(&semaphore).acquire_owned(), if pending.peek().is_some() => {
                    let (Ok(permit), Some(task)) = (permit, pending.next()) else {
                        break;
                    };
                    let span = info_span!("encode_task", file = %task.file_name, format = %task.format);
                    set.spawn(task.run(Arc::clone(&settings), self.cancel.clone(), permit).instrument(span));
                }
            }
        }
        Ok(outputs)
    }
}
