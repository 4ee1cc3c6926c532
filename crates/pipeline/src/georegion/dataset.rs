//! Boundary dataset readers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fds_core::region::BoundaryFeature;
use fds_core::tooling::{ToolInvocation, ToolRunner};

use super::IngestError;

/// WGS84, the CRS regions are stored in.
pub const WGS84_SRID: u32 = 4326;

/// Reads the features of one dataset layer, reprojected to `target_srid`.
#[async_trait]
pub trait BoundaryDataset: Send + Sync {
    async fn read_layer(
        &self,
        layer: &str,
        target_srid: u32,
    ) -> Result<Vec<BoundaryFeature>, IngestError>;
}

/// Largest layer export accepted from `ogr2ogr`.
const MAX_LAYER_BYTES: usize = 1024 * 1024 * 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// [`BoundaryDataset`] backed by GDAL: `ogr2ogr` converts a layer of any
/// supported file (shapefile directory, GeoPackage, ...) to GeoJSON text
/// sequences on stdout.
pub struct OgrDataset {
    path: PathBuf,
    runner: Arc<dyn ToolRunner>,
    program: String,
    timeout: Duration,
}

impl OgrDataset {
    pub fn new(path: impl Into<PathBuf>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            path: path.into(),
            runner,
            program: "ogr2ogr".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn invocation(&self, layer: &str, target_srid: u32) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .args(["-f", "GeoJSONSeq", "/vsistdout/", "-t_srs"])
            .arg(format!("EPSG:{target_srid}"))
            .arg(self.path.display().to_string())
            .arg(layer)
            .timeout(self.timeout)
            .max_output_bytes(MAX_LAYER_BYTES)
    }
}

#[async_trait]
impl BoundaryDataset for OgrDataset {
    async fn read_layer(
        &self,
        layer: &str,
        target_srid: u32,
    ) -> Result<Vec<BoundaryFeature>, IngestError> {
        let output = self.runner.run(self.invocation(layer, target_srid)).await?;
        if output.stdout.len() >= MAX_LAYER_BYTES {
            return Err(IngestError::InvalidFeature {
                layer: layer.to_string(),
                reason: format!("layer export exceeds {MAX_LAYER_BYTES} bytes"),
            });
        }
        let features = parse_feature_sequence(layer, &output.stdout_text())?;
        tracing::info!(layer, features = features.len(), elapsed_ms = output.duration_ms, "Read dataset layer");
        Ok(features)
    }
}

/// Parse GeoJSON text sequences: one feature per line, optionally prefixed
/// with the RS record separator.
pub fn parse_feature_sequence(layer: &str, text: &str) -> Result<Vec<BoundaryFeature>, IngestError> {
    text.lines()
        .map(|line| line.trim_start_matches('\u{1e}').trim())
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str::<BoundaryFeature>(line).map_err(|e| IngestError::InvalidFeature {
                layer: layer.to_string(),
                reason: format!("feature {index}: {e}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use fds_core::tooling::ProcessRunner;

    use super::*;

    #[test]
    fn parses_feature_lines() {
        let text = concat!(
            "{\"type\":\"Feature\",\"properties\":{\"ARS\":\"11\",\"GEN\":\"Berlin\"},\"geometry\":null}\n",
            "\n",
            "\u{1e}{\"type\":\"Feature\",\"properties\":{\"ARS\":\"12\",\"GEN\":\"Brandenburg\"},\"geometry\":{\"type\":\"Point\",\"coordinates\":[13.0,52.4]}}\n",
        );
        let features = parse_feature_sequence("vg25_lan", text).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name(), "Berlin");
        assert!(features[0].geometry.is_null());
        assert_eq!(features[1].region_identifier().as_deref(), Some("120000000000"));
    }

    #[test]
    fn broken_lines_name_the_layer() {
        let result = parse_feature_sequence("vg25_gem", "{\"type\":\"Feature\",\"properties\":{}}\n{oops\n");
        assert_matches!(
            result,
            Err(IngestError::InvalidFeature { ref layer, ref reason }) if layer == "vg25_gem" && reason.starts_with("feature 1")
        );
    }

    #[test]
    fn ogr_command_line() {
        let dataset = OgrDataset::new("/data/vg25.gpkg", Arc::new(ProcessRunner));
        let invocation = dataset.invocation("vg25_krs", WGS84_SRID);
        assert_eq!(
            invocation.command_line(),
            "ogr2ogr -f GeoJSONSeq /vsistdout/ -t_srs EPSG:4326 /data/vg25.gpkg vg25_krs"
        );
        assert_eq!(invocation.timeout, DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn reads_layer_through_the_runner() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-ogr2ogr");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"type\":\"Feature\",\"properties\":{\"ARS\":\"'\"$6\"'\"},\"geometry\":null}'\n",
        )
        .unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let dataset = OgrDataset::new("07", Arc::new(ProcessRunner))
            .with_program(script.display().to_string());
        let features = dataset.read_layer("vg25_lan", WGS84_SRID).await.unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].ars().as_deref(), Some("07"));
    }
}
