//! # netcanvas-export
//!
//! Codebook-driven export of interview session networks to GraphML and CSV.
//!
//! Each session holds an ego (the respondent), alters (nodes) and the
//! relationships between them (edges), all typed by a per-protocol
//! codebook. The exporter turns a batch of sessions into a zip archive of
//! encoded files.
//!
//! ## Architecture
//!
//! ```text
//! Sessions → validate → stamp ego → resequence ids → group by protocol
//!                                                        ↓ (union)
//!          Archive ← encode queue ← partition by entity type
//!             ↓
//!          SaveTarget
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Export ids are assigned in input order: sessions, then nodes, then edges
//! - Partitions follow first-seen entity type order
//! - GraphML keys are declared once per id, in first-seen order
//! - The report fingerprint depends only on the archived file contents
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use netcanvas_export::{CopyToPath, ExportOptions, FileExportManager, Protocol, Session};
//!
//! # async fn run(sessions: Vec<Session>, protocols: BTreeMap<String, Protocol>) -> Result<(), netcanvas_export::ExportError> {
//! let manager = FileExportManager::new(ExportOptions::default());
//! let outcome = manager
//!     .export_sessions(sessions, protocols, Arc::new(CopyToPath::new("export.zip")))
//!     .await?;
//! if let Some(report) = outcome.report() {
//!     println!("{} files, fingerprint {}", report.files.len(), report.fingerprint);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod resolver;
pub mod cancel;
pub mod canonical;
pub mod pipeline;
pub mod encode;
pub mod export;

// Re-exports
pub use types::{
    Attributes, CategoryOption, Codebook, CsvOptions, Entity, EntityDefinition, EntityKind,
    ExportFormat, ExportOptions, GlobalOptions, PartitionBy, Protocol, Session, SessionVariables,
    VariableDefinition, VariableKind, VariableType, EGO_TYPE,
};
pub use resolver::{resolve_entity_name, resolve_name, resolve_options, resolve_type};
pub use cancel::{CancelToken, Cancelled};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use pipeline::{
    prepare_sessions, transform, ExportEntity, ExportId, ExportNetwork, IdLookup,
    PartitionedNetwork, PreparedSessions, SkippedSession, ValidationError,
};
pub use encode::{encode, encoder_for, ChunkStream, EncodeError, EncodeSettings, Encoder};
pub use export::{
    AbortHandle, Archiver, CopyToPath, ExportConfig, ExportError, ExportJob, ExportOutcome,
    ExportReport, ExportedFile, FailedTask, FileExportManager, JobState, NoOpProgress, Progress,
    ProgressEvent, ProgressReporter, RecordingProgress, SaveOutcome, SaveTarget, TracingProgress,
    ZipArchiver,
};
