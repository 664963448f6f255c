//! A single encode task: one partition in one format, streamed to one file.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, Span};

use crate::cancel::CancelToken;
use crate::encode::{encode, EncodeError, EncodeSettings};
use crate::pipeline::PartitionedNetwork;
use crate::types::{ExportFormat, Protocol};

/// Why a task did not produce a file.
#[derive(Debug, Error)]
pub(crate) enum TaskError {
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Encode(EncodeError),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode task panicked: {0}")]
    Panicked(String),
}

impl From<EncodeError> for TaskError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Stopped => Self::Cancelled,
            EncodeError::Io(io) => Self::Io(io),
            other => Self::Encode(other),
        }
    }
}

/// A file written by a task.
#[derive(Debug, Clone)]
pub(crate) struct WrittenFile {
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug)]
pub(crate) struct EncodeTask {
    /// Index of the network this task encodes, for per-session progress.
    pub network: usize,
    pub file_name: String,
    pub path: PathBuf,
    pub format: ExportFormat,
    pub partition: PartitionedNetwork,
    pub protocol: Arc<Protocol>,
}

#[derive(Debug)]
pub(crate) struct TaskOutput {
    pub network: usize,
    pub file_name: String,
    pub format: ExportFormat,
    pub partition: Option<String>,
    pub result: Result<WrittenFile, TaskError>,
}

impl EncodeTask {
    /// Encode and write on the blocking pool; the partial file is removed on
    /// any error.
    pub async fn run(
        self,
        settings: Arc<EncodeSettings>,
        cancel: CancelToken,
        _permit: OwnedSemaphorePermit,
    ) -> TaskOutput {
        let network = self.network;
        let file_name = self.file_name.clone();
        let format = self.format;
        let partition = self.partition.label.clone();
        let path = self.path.clone();

        let span = Span::current();
        let encoded = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            self.write(&settings, &cancel)
        });
        let result = match encoded.await {
            Ok(result) => result,
            Err(err) => Err(TaskError::Panicked(err.to_string())),
        };
        if result.is_err() {
            let _ = tokio::fs::remove_file(&path).await;
        }
        TaskOutput {
            network,
            file_name,
            format,
            partition,
            result,
        }
    }

    fn write(&self, settings: &EncodeSettings, cancel: &CancelToken) -> Result<WrittenFile, TaskError> {
        cancel.check().map_err(|_| TaskError::Cancelled)?;

        let mut writer = BufWriter::new(File::create(&self.path)?);
        let mut hasher = Sha256::new();
        let mut bytes = 0u64;

        let mut stream = encode(self.format, &self.partition, &self.protocol.codebook, settings);
        loop {
            if cancel.is_cancelled() {
                stream.stop();
            }
            let Some(chunk) = stream.next() else {
                break;
            };
            let chunk = chunk?;
            hasher.update(chunk.as_bytes());
            writer.write_all(chunk.as_bytes())?;
            bytes += chunk.len() as u64;
        }
        let file = writer.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()?;

        debug!(file = %self.file_name, bytes, "Encoded file");
        Ok(WrittenFile {
            path: self.path.clone(),
            bytes,
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ExportEntity, ExportId, ExportNetwork, Provenance, SessionRecord};
    use crate::types::{Attributes, Codebook};
    use tokio::sync::Semaphore;

    fn task(dir: &std::path::Path, format: ExportFormat) -> EncodeTask {
        let node = ExportEntity {
            export_id: ExportId(1),
            uid: "n1".to_string(),
            entity_type: "person".to_string(),
            attributes: Attributes::new(),
            ego_uid: None,
            session_id: None,
            endpoints: None,
        };
        let network = Arc::new(ExportNetwork {
            protocol_uid: "p1".to_string(),
            nodes: Arc::new(vec![node]),
            edges: Arc::new(Vec::new()),
            provenance: Provenance::Session(SessionRecord::default()),
        });
        EncodeTask {
            network: 0,
            file_name: "out.graphml".to_string(),
            path: dir.join("out.graphml"),
            format,
            partition: PartitionedNetwork::whole(network),
            protocol: Arc::new(Protocol::new("Test", Codebook::default())),
        }
    }

    async fn permit() -> OwnedSemaphorePermit {
        Arc::new(Semaphore::new(1)).acquire_owned().await.unwrap()
    }

    #[tokio::test]
    async fn test_writes_and_hashes_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = task(dir.path(), ExportFormat::GraphMl)
            .run(Arc::new(EncodeSettings::default()), CancelToken::new(), permit().await)
            .await;

        let written = output.result.unwrap();
        let contents = std::fs::read(&written.path).unwrap();
        assert_eq!(written.bytes, contents.len() as u64);
        assert_eq!(written.sha256, hex::encode(Sha256::digest(&contents)));
        assert!(String::from_utf8(contents).unwrap().contains("<node id=\"1\">"));
    }

    #[tokio::test]
    async fn test_cancelled_task_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let output = task(dir.path(), ExportFormat::GraphMl)
            .run(Arc::new(EncodeSettings::default()), cancel, permit().await)
            .await;

        assert!(matches!(output.result, Err(TaskError::Cancelled)));
        assert!(!dir.path().join("out.graphml").exists());
    }
}
