mod common;

use std::path::PathBuf;
use std::sync::Arc;

use assert_matches::assert_matches;
use fds_cloud::DownloadError;
use fds_core::osm::AmenityTopics;
use fds_core::tooling::ToolError;
use fds_pipeline::osm_refresh::{
    read_last_update, AmenityRefresh, RefreshConfig, RefreshError, RefreshStage, LAST_UPDATE_FILENAME,
};
use serde_json::json;
use tempfile::TempDir;

use common::{date, FakeAmenityImporter, FakeBoundaryImporter, FakeDownloader, RecordingRunner};

const EXTRACT_URL: &str = "https://download.example.org/europe/germany/berlin-latest.osm.pbf";

struct Harness {
    state_dir: TempDir,
    downloader: Arc<FakeDownloader>,
    runner: Arc<RecordingRunner>,
    boundaries: Arc<FakeBoundaryImporter>,
    importer: Arc<FakeAmenityImporter>,
}

impl Harness {
    fn new(runner: RecordingRunner) -> Self {
        Self {
            state_dir: tempfile::tempdir().unwrap(),
            downloader: Arc::new(FakeDownloader::default()),
            runner: Arc::new(runner),
            boundaries: Arc::new(FakeBoundaryImporter::default()),
            importer: Arc::new(FakeAmenityImporter::default()),
        }
    }

    fn refresh(&self) -> AmenityRefresh {
        let topics = AmenityTopics::from_value(&json!({
            "klo": [["amenity", "toilets"]],
            "kita": [["amenity", "kindergarten"], ["childcare", "*"]],
        }))
        .unwrap();
        let mut config = RefreshConfig::new(topics, self.state_dir.path());
        config.extract_url = EXTRACT_URL.to_string();
        AmenityRefresh::new(
            config,
            self.downloader.clone(),
            self.runner.clone(),
            self.boundaries.clone(),
            self.importer.clone(),
        )
    }

    fn last_update_file(&self) -> PathBuf {
        self.state_dir.path().join(LAST_UPDATE_FILENAME)
    }
}

// ---------------------------------------------------------------------------
// Successful runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_runs_stages_in_order() {
    let h = Harness::new(RecordingRunner::default());

    let report = h.refresh().run(date("2024-06-01")).await.unwrap();

    assert_eq!(report.downloaded_bytes, 11);
    assert_eq!(report.boundaries.matched, 1);
    assert_eq!(report.previous_update, None);
    assert_eq!(report.completed_on, date("2024-06-01"));

    let downloads = h.downloader.downloads();
    assert_eq!(downloads.len(), 1);
    let (url, extract) = &downloads[0];
    assert_eq!(url, EXTRACT_URL);
    assert_eq!(extract.file_name().unwrap(), "berlin-latest.osm.pbf");
    let scratch = extract.parent().unwrap();
    assert_eq!(h.boundaries.extracts(), vec![extract.clone()]);

    assert_eq!(h.runner.programs(), vec!["osmconvert", "osmosis"]);
    let invocations = h.runner.invocations();
    let nodes = scratch.join("germany_nodes.pbf");
    let xml = scratch.join("amenities.xml");

    let osmconvert = &invocations[0];
    assert_eq!(osmconvert.working_dir.as_deref(), Some(scratch));
    assert_eq!(
        osmconvert.args,
        vec![
            extract.display().to_string(),
            "--all-to-nodes".to_string(),
            format!("-o={}", nodes.display()),
            "--max-objects=1000000000".to_string(),
        ]
    );

    let osmosis = &invocations[1];
    assert_eq!(osmosis.working_dir.as_deref(), Some(scratch));
    assert!(osmosis
        .args
        .contains(&"keyValueList=amenity.kindergarten,amenity.toilets".to_string()));
    assert!(osmosis.args.contains(&"childcare=*".to_string()));
    assert_eq!(osmosis.args.iter().filter(|a| *a == "--merge").count(), 1);
    assert_eq!(
        osmosis.args[osmosis.args.len() - 2..],
        ["--write-xml".to_string(), xml.display().to_string()]
    );

    assert_eq!(h.importer.calls(), vec![(xml, None)]);
    assert_eq!(
        std::fs::read_to_string(h.last_update_file()).unwrap(),
        "2024-06-01"
    );
    assert!(!scratch.exists(), "scratch directory is removed");
}

#[tokio::test]
async fn second_run_passes_previous_update_date() {
    let h = Harness::new(RecordingRunner::default());

    h.refresh().run(date("2024-06-01")).await.unwrap();
    let report = h.refresh().run(date("2024-07-01")).await.unwrap();

    assert_eq!(report.previous_update, Some(date("2024-06-01")));
    let calls = h.importer.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1, Some(date("2024-06-01")));
    assert_eq!(read_last_update(h.state_dir.path()).await, Some(date("2024-07-01")));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tool_failure_stops_the_refresh() {
    let h = Harness::new(RecordingRunner::failing("osmconvert"));

    let err = h.refresh().run(date("2024-06-01")).await.unwrap_err();

    assert_matches!(
        err,
        RefreshError::Tool {
            stage: RefreshStage::ConvertToNodes,
            source: ToolError::ExecutionFailed { exit_code: 1, .. }
        }
    );
    assert_eq!(err.stage(), Some(RefreshStage::ConvertToNodes));
    assert_eq!(h.runner.programs(), vec!["osmconvert"]);
    assert!(h.importer.calls().is_empty());
    assert!(!h.last_update_file().exists());

    let (_, extract) = &h.downloader.downloads()[0];
    assert!(!extract.parent().unwrap().exists(), "scratch directory is removed on failure");
}

#[tokio::test]
async fn download_failure_runs_no_tools() {
    let mut h = Harness::new(RecordingRunner::default());
    h.downloader = Arc::new(FakeDownloader {
        fail_status: Some(404),
        ..FakeDownloader::default()
    });

    let err = h.refresh().run(date("2024-06-01")).await.unwrap_err();

    assert_matches!(err, RefreshError::Download(DownloadError::HttpStatus { status: 404, .. }));
    assert_eq!(err.stage(), Some(RefreshStage::Download));
    assert!(h.boundaries.extracts().is_empty());
    assert!(h.runner.invocations().is_empty());
    assert!(!h.last_update_file().exists());
}

#[tokio::test]
async fn import_failure_keeps_previous_update_date() {
    let mut h = Harness::new(RecordingRunner::default());
    std::fs::write(h.last_update_file(), "2024-05-01").unwrap();
    h.importer = Arc::new(FakeAmenityImporter {
        fail: true,
        ..FakeAmenityImporter::default()
    });

    let err = h.refresh().run(date("2024-06-01")).await.unwrap_err();

    assert_matches!(err, RefreshError::Tool { stage: RefreshStage::Import, .. });
    assert_eq!(h.importer.calls()[0].1, Some(date("2024-05-01")));
    assert_eq!(read_last_update(h.state_dir.path()).await, Some(date("2024-05-01")));
}
