//! End-to-end export tests.
//!
//! These tests drive full jobs through the manager and inspect the saved
//! archive, the report and the progress stream.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netcanvas_export::export::{ArchiveError, ArchiveProgressFn};
use netcanvas_export::{
    Archiver, CancelToken, CopyToPath, ExportConfig, ExportError, ExportOptions, FileExportManager, JobState,
    Protocol, ProgressEvent, RecordingProgress, Session,
};
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn protocol() -> Protocol {
    serde_json::from_value(json!({
        "name": "Test Protocol",
        "codebook": {
            "node": {
                "person": {
                    "name": "Person",
                    "variables": {
                        "v-name": { "name": "name", "type": "text" },
                        "v-age": { "name": "age", "type": "number" },
                        "v-pos": { "name": "layout", "type": "layout" }
                    }
                }
            },
            "edge": {
                "friend": { "name": "Friendship", "variables": {} }
            },
            "ego": {
                "ego": {
                    "variables": {
                        "v-mood": { "name": "mood", "type": "text" }
                    }
                }
            }
        }
    }))
    .unwrap()
}

fn protocols() -> BTreeMap<String, Protocol> {
    BTreeMap::from([("p1".to_string(), protocol())])
}

fn session(n: u32) -> Session {
    serde_json::from_value(json!({
        "nodes": [
            { "_uid": format!("s{n}-a"), "type": "person",
              "attributes": { "v-name": "Ana", "v-age": 30, "v-pos": { "x": 0.5, "y": 0.25 } } },
            { "_uid": format!("s{n}-b"), "type": "person",
              "attributes": { "v-name": "Ben", "v-age": null } }
        ],
        "edges": [
            { "_uid": format!("s{n}-e"), "type": "friend", "from": format!("s{n}-a"), "to": format!("s{n}-b") }
        ],
        "ego": { "_uid": format!("s{n}-ego"), "attributes": { "v-mood": "good" } },
        "sessionVariables": {
            "caseId": format!("case {n}"),
            "sessionId": format!("s{n}"),
            "protocolUID": "p1",
            "protocolName": "Test Protocol",
            "sessionExported": "2024-01-01T00:00:00Z",
            "codebookHash": "hash"
        }
    }))
    .unwrap()
}

fn manager(root: &Path, options: ExportOptions) -> FileExportManager {
    FileExportManager::new(options)
        .with_config(ExportConfig::default().with_temp_root(root.join("work")))
}

fn read_archive(path: &Path) -> BTreeMap<String, String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut files = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        files.insert(entry.name().to_string(), contents);
    }
    files
}

fn work_dir_is_empty(root: &Path) -> bool {
    std::fs::read_dir(root.join("work"))
        .map(|entries| entries.count() == 0)
        .unwrap_or(true)
}

/// Archiver that never finishes, to hold a job in the archiving state.
struct StalledArchiver;

#[async_trait]
impl Archiver for StalledArchiver {
    async fn archive(
        &self,
        _sources: &[PathBuf],
        _destination: &Path,
        _on_progress: ArchiveProgressFn,
        _cancel: &CancelToken,
    ) -> Result<PathBuf, ArchiveError> {
        std::future::pending().await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Single-session export
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_every_format_per_session() {
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("export.zip");
    let mut options = ExportOptions::default();
    options.export_csv.adjacency_matrix = true;

    let outcome = manager(temp.path(), options)
        .export_sessions(
            vec![session(1), session(2)],
            protocols(),
            Arc::new(CopyToPath::new(&destination)),
        )
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    let mut expected = Vec::new();
    for prefix in ["case1_s1", "case2_s2"] {
        expected.push(format!("{prefix}.graphml"));
        expected.push(format!("{prefix}_adjacencyMatrix_Friendship.csv"));
        expected.push(format!("{prefix}_attributeList_Person.csv"));
        expected.push(format!("{prefix}_edgeList_Friendship.csv"));
        expected.push(format!("{prefix}_ego.csv"));
    }
    expected.sort();
    assert_eq!(report.file_names(), expected);
    assert!(report.failed.is_empty());
    assert!(report.skipped.is_empty());

    let archive = read_archive(&destination);
    assert_eq!(archive.keys().cloned().collect::<Vec<_>>(), expected);

    let graphml = &archive["case1_s1.graphml"];
    assert!(graphml.contains("nc:caseId=\"case 1\""));
    assert!(graphml.contains("<node id=\"1\">"));
    assert!(graphml.contains("<data key=\"v-pos_X\">960.00</data>"));
    assert!(graphml.contains("<data key=\"v-pos_Y\">810.00</data>"));

    // Ids continue across sessions.
    let second = &archive["case2_s2.graphml"];
    assert!(second.contains("<node id=\"4\">") || second.contains("<node id=\"5\">"));
    assert!(!second.contains("<node id=\"1\">"));

    let edges = &archive["case1_s1_edgeList_Friendship.csv"];
    assert_eq!(edges.lines().count(), 3, "header plus both directions");

    assert!(work_dir_is_empty(temp.path()));
}

#[tokio::test]
async fn test_report_hashes_match_archive() {
    use sha2::{Digest, Sha256};

    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("export.zip");
    let outcome = manager(temp.path(), ExportOptions::default())
        .export_sessions(vec![session(1)], protocols(), Arc::new(CopyToPath::new(&destination)))
        .await
        .unwrap();
    let report = outcome.report().unwrap();
    let archive = read_archive(&destination);

    for file in &report.files {
        let contents = &archive[&file.file_name];
        assert_eq!(file.bytes, contents.len() as u64);
        assert_eq!(file.sha256, hex::encode(Sha256::digest(contents.as_bytes())));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Union
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_union_merges_sessions_per_protocol() {
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("export.zip");
    let mut options = ExportOptions::default();
    options.global_options.unify_networks = true;

    let recorder = Arc::new(RecordingProgress::new());
    let outcome = manager(temp.path(), options)
        .with_progress(recorder.clone())
        .export_sessions(
            vec![session(1), session(2)],
            protocols(),
            Arc::new(CopyToPath::new(&destination)),
        )
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    assert!(report.file_names().contains(&"TestProtocol.graphml"));
    assert!(report.file_names().contains(&"TestProtocol_ego.csv"));

    let archive = read_archive(&destination);
    let graphml = &archive["TestProtocol.graphml"];
    assert_eq!(graphml.matches("<graph ").count(), 2);
    assert_eq!(graphml.matches("<node ").count(), 4);
    assert!(graphml.contains("<data key=\"networkCanvasSessionID\">s2</data>"));

    let egos = &archive["TestProtocol_ego.csv"];
    assert_eq!(egos.lines().count(), 3);

    assert!(recorder.contains(|e| matches!(e, ProgressEvent::Merging)));
    assert!(recorder.contains(|e| matches!(e, ProgressEvent::SessionExported { count: 1, total: 1 })));
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure handling
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_session_is_skipped() {
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("export.zip");
    let mut bad = session(2);
    bad.session_variables.codebook_hash = None;

    let outcome = manager(temp.path(), ExportOptions::default())
        .export_sessions(vec![session(1), bad], protocols(), Arc::new(CopyToPath::new(&destination)))
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].session_id.as_deref(), Some("s2"));
    assert!(report.file_names().iter().all(|name| name.starts_with("case1_s1")));
}

#[tokio::test]
async fn test_malformed_layout_fails_only_its_files() {
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("export.zip");
    let mut broken = session(2);
    broken.nodes[0]
        .attributes
        .insert("v-pos".to_string(), json!("not a position"));

    let recorder = Arc::new(RecordingProgress::new());
    let outcome = manager(temp.path(), ExportOptions::default())
        .with_progress(recorder.clone())
        .export_sessions(vec![session(1), broken], protocols(), Arc::new(CopyToPath::new(&destination)))
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    let failed: Vec<_> = report.failed.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(failed, vec!["case2_s2.graphml", "case2_s2_attributeList_Person.csv"]);
    assert!(report.file_names().contains(&"case2_s2_edgeList_Friendship.csv"));
    assert!(!read_archive(&destination).contains_key("case2_s2.graphml"));
    assert!(recorder.contains(|e| matches!(e, ProgressEvent::TaskFailed { .. })));
}

#[tokio::test]
async fn test_missing_protocol_fails_fast() {
    let temp = tempfile::tempdir().unwrap();
    let mut orphan = session(1);
    orphan.session_variables.protocol_uid = Some("p9".to_string());

    let err = manager(temp.path(), ExportOptions::default())
        .export_sessions(vec![orphan], protocols(), Arc::new(CopyToPath::new(temp.path().join("x.zip"))))
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::MissingProtocol(uid) if uid == "p9"));
}

#[tokio::test]
async fn test_no_formats_is_nothing_to_export() {
    let temp = tempfile::tempdir().unwrap();
    let options: ExportOptions =
        serde_json::from_value(json!({ "exportGraphML": false, "exportCSV": false })).unwrap();

    let err = manager(temp.path(), options)
        .export_sessions(vec![session(1)], protocols(), Arc::new(CopyToPath::new(temp.path().join("x.zip"))))
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::NothingToExport));
    assert!(work_dir_is_empty(temp.path()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation and progress
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_abort_while_archiving() {
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("export.zip");
    let recorder = Arc::new(RecordingProgress::new());

    let job = manager(temp.path(), ExportOptions::default())
        .with_archiver(Arc::new(StalledArchiver))
        .with_progress(recorder.clone())
        .prepare_export_job(vec![session(1)], protocols(), Arc::new(CopyToPath::new(&destination)))
        .unwrap();
    let handle = job.abort_handle();
    let running = tokio::spawn(job.run());

    tokio::time::timeout(Duration::from_secs(10), async {
        while handle.state() != JobState::Archiving {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    handle.abort();

    let outcome = running.await.unwrap().unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(handle.state(), JobState::Aborted);
    assert!(!destination.exists());
    assert!(work_dir_is_empty(temp.path()));
    assert!(recorder.contains(|e| matches!(e, ProgressEvent::Cancelled)));
    assert!(!recorder.contains(|e| matches!(e, ProgressEvent::Finished)));
}

#[tokio::test]
async fn test_progress_is_monotonic_and_complete() {
    let temp = tempfile::tempdir().unwrap();
    let recorder = Arc::new(RecordingProgress::new());

    manager(temp.path(), ExportOptions::default())
        .with_config(ExportConfig::default().with_temp_root(temp.path()).with_concurrency(2))
        .with_progress(recorder.clone())
        .export_sessions(
            (1..=5).map(session).collect(),
            protocols(),
            Arc::new(CopyToPath::new(temp.path().join("export.zip"))),
        )
        .await
        .unwrap();

    let percents = recorder.percents();
    assert_eq!(percents.first(), Some(&0.0));
    assert_eq!(percents.last(), Some(&100.0));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));

    let events = recorder.events();
    let exported = events
        .iter()
        .filter(|p| matches!(p.event, ProgressEvent::SessionExported { .. }))
        .count();
    assert_eq!(exported, 5);
    assert!(matches!(
        events.last().map(|p| &p.event),
        Some(ProgressEvent::Finished)
    ));
}
