//! Network Canvas Export Binary
//!
//! Exports a batch of interview sessions to a zip archive of GraphML and CSV
//! files.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `EXPORT_INPUT`: Path of a JSON job file (required)
//! - `EXPORT_OUTPUT`: Destination archive path (default: ./networkCanvasExport.zip)
//! - `NETCANVAS_EXPORT_CONCURRENCY`: Maximum concurrent encode tasks (default: 1000)
//! - `NETCANVAS_EXPORT_TMPDIR`: Root for per-job working directories (default: system temp)
//! - `NETCANVAS_EXPORT_BATCH_SIZE`: GraphML elements per chunk (default: 100)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! The job file holds `{"sessions": [...], "protocols": {uid: protocol}, "options": {...}}`.
//!
//! ## Usage
//!
//! ```bash
//! EXPORT_INPUT=job.json EXPORT_OUTPUT=out/export.zip cargo run --bin netcanvas_export
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use netcanvas_export::{
    CopyToPath, ExportConfig, ExportOptions, ExportOutcome, FileExportManager, Protocol, Session,
    TracingProgress,
};

/// Input job file
#[derive(Debug, Deserialize)]
struct JobFile {
    sessions: Vec<Session>,
    protocols: BTreeMap<String, Protocol>,
    #[serde(default)]
    options: ExportOptions,
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "netcanvas_export=info".into());

    if log_format == "pretty" {
        // Pretty format for local development
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Network Canvas export");

    let input = match std::env::var("EXPORT_INPUT") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => {
            error!("EXPORT_INPUT not set");
            return Err("EXPORT_INPUT must name a job file".into());
        }
    };
    let config = ExportConfig::from_env();
    let output = std::env::var("EXPORT_OUTPUT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(&config.archive_name));

    let load_start = Instant::now();
    let job: JobFile = serde_json::from_slice(&tokio::fs::read(&input).await?)?;
    info!(
        input = %input.display(),
        sessions = job.sessions.len(),
        protocols = job.protocols.len(),
        latency_ms = load_start.elapsed().as_millis() as u64,
        "Loaded job file"
    );

    let manager = FileExportManager::new(job.options)
        .with_config(config)
        .with_progress(Arc::new(TracingProgress));
    let export = manager.prepare_export_job(
        job.sessions,
        job.protocols,
        Arc::new(CopyToPath::new(&output)),
    )?;

    let abort = export.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, aborting export");
            abort.abort();
        }
    });

    let started = Instant::now();
    match export.run().await? {
        ExportOutcome::Completed(report) => {
            for skipped in &report.skipped {
                warn!(
                    session_id = skipped.session_id.as_deref().unwrap_or_default(),
                    reason = %skipped.reason,
                    "Session skipped"
                );
            }
            for failed in &report.failed {
                warn!(file = %failed.file_name, message = %failed.message, "File not exported");
            }
            info!(
                archive = %report.archive_path.display(),
                files = report.files.len(),
                fingerprint = %report.fingerprint,
                latency_ms = started.elapsed().as_millis() as u64,
                "Export complete"
            );
        }
        ExportOutcome::Cancelled => info!("Export cancelled"),
    }

    Ok(())
}
