//! Export coordinator - drives the format exporters for one dataset
//!
//! The coordinator describes the source, owns the dataset temp workspace,
//! runs the requested exporters in canonical order and aggregates their
//! outcomes into an [`ExportResult`].

use super::exporters::{ExportContext, ExportSettings, ExporterRegistry};
use super::workspace::DatasetWorkspace;
use crate::adapters::source::SpatialSource;
use crate::config::{ExportConfig, PathsConfig};
use crate::domain::{
    DatasetExportFailure, DatasetIdentifier, DatasetSpec, ExportResult, FormatExportError,
    FormatOutcome, FormatTag, GeoPublishError, Result,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Export coordinator
pub struct ExportCoordinator {
    source: Arc<dyn SpatialSource>,
    registry: ExporterRegistry,
    output_root: PathBuf,
    temp_root: PathBuf,
    dataset_prefix: Option<String>,
    settings: ExportSettings,
}

impl ExportCoordinator {
    pub fn new(
        source: Arc<dyn SpatialSource>,
        registry: ExporterRegistry,
        paths: &PathsConfig,
        export: &ExportConfig,
    ) -> Self {
        Self {
            source,
            registry,
            output_root: paths.output_root.clone(),
            temp_root: paths.temp_root.clone(),
            dataset_prefix: export.dataset_prefix.clone(),
            settings: ExportSettings::from(export),
        }
    }

    /// Derives the identifier of `spec` with the configured prefix
    pub fn identifier(&self, spec: &DatasetSpec) -> Result<DatasetIdentifier> {
        DatasetIdentifier::derive(&spec.dataset_name, self.dataset_prefix.as_deref())
            .map_err(GeoPublishError::Validation)
    }

    /// `<output_root>/<identifier>`
    pub fn dataset_dir(&self, identifier: &DatasetIdentifier) -> PathBuf {
        self.output_root.join(identifier.as_str())
    }

    /// Exports `spec` into every requested format
    ///
    /// Format failures are recorded in the result and never abort the other
    /// formats. Spatial formats requested for a table are recorded as
    /// SKIPPED.
    ///
    /// # Errors
    ///
    /// - identifier derivation or source description failed
    /// - the workspace or output directory could not be created
    /// - no format succeeded ([`DatasetExportFailure`] carrying the result)
    pub async fn run(&self, spec: &DatasetSpec) -> Result<ExportResult> {
        let start_time = Instant::now();
        let identifier = self.identifier(spec)?;
        let formats = spec.formats();

        tracing::info!(
            dataset = %spec.dataset_name,
            identifier = %identifier,
            formats = ?formats,
            "Starting dataset export"
        );

        let description = self.source.describe(&spec.source()).await?;
        tracing::debug!(
            identifier = %identifier,
            kind = ?description.kind,
            fields = description.fields.len(),
            features = ?description.feature_count,
            "Described source"
        );

        let workspace = DatasetWorkspace::acquire(&self.temp_root, &identifier).await?;
        let dataset_dir = self.dataset_dir(&identifier);
        tokio::fs::create_dir_all(&dataset_dir).await?;

        let ctx = ExportContext {
            spec,
            identifier: &identifier,
            description: &description,
            dataset_dir: &dataset_dir,
            temp_dir: workspace.path(),
            settings: &self.settings,
        };

        let mut result = ExportResult::new(identifier.clone(), dataset_dir.clone());
        for format in formats {
            let outcome = self.export_format(format, &ctx).await;
            result.record(format, outcome);
        }

        workspace.release().await?;

        let attempted = result.len();
        tracing::info!(
            identifier = %identifier,
            succeeded = result.succeeded(),
            failed = result.failed(),
            skipped = result.skipped(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Dataset export finished"
        );

        if result.succeeded() == 0 {
            return Err(DatasetExportFailure {
                identifier,
                attempted,
                result,
            }
            .into());
        }

        Ok(result)
    }

    async fn export_format(&self, format: FormatTag, ctx: &ExportContext<'_>) -> FormatOutcome {
        let artifact_path = ctx.artifact_path(format);

        let Some(exporter) = self.registry.get(format) else {
            let error = FormatExportError::Unsupported {
                format,
                reason: "no exporter registered".to_string(),
            };
            tracing::error!(format = %format, error = %error, "Format export failed");
            return FormatOutcome::failed(artifact_path, error);
        };

        match exporter.export(ctx).await {
            Ok(path) => {
                tracing::info!(
                    format = %format,
                    artifact = %path.display(),
                    "Format exported"
                );
                FormatOutcome::success(path)
            }
            Err(FormatExportError::SourceKind { .. }) => {
                tracing::info!(
                    format = %format,
                    "Skipping spatial format for non-spatial source"
                );
                FormatOutcome::skipped(artifact_path, "source has no geometry")
            }
            Err(error) => {
                tracing::error!(format = %format, error = %error, "Format export failed");
                FormatOutcome::failed(artifact_path, error)
            }
        }
    }

    /// Builds a result from artifacts already in the canonical layout
    ///
    /// Used in publish-only mode: present artifacts are SUCCESS, absent ones
    /// SKIPPED. Never touches the source.
    pub async fn collect_existing(&self, spec: &DatasetSpec) -> Result<ExportResult> {
        let identifier = self.identifier(spec)?;
        let dataset_dir = self.dataset_dir(&identifier);
        let result = collect_artifacts(&dataset_dir, identifier, &spec.formats()).await;

        tracing::info!(
            dataset = %spec.dataset_name,
            found = result.succeeded(),
            missing = result.skipped(),
            "Collected existing artifacts"
        );
        Ok(result)
    }
}

/// Checks the canonical artifact path of each format in `formats`
pub async fn collect_artifacts(
    dataset_dir: &Path,
    identifier: DatasetIdentifier,
    formats: &BTreeSet<FormatTag>,
) -> ExportResult {
    let mut result = ExportResult::new(identifier, dataset_dir.to_path_buf());

    for &format in formats {
        let path = ExportResult::artifact_path(dataset_dir, &result.identifier, format);
        let outcome = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => FormatOutcome::success(path),
            _ => FormatOutcome::skipped(path, "artifact not found"),
        };
        result.record(format, outcome);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::writer::{FormatWriter, WriteRequest};
    use crate::domain::{
        ExportStatus, FieldInfo, SourceDescription, SourceError, SourceKind, SourceRef,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedSource {
        kind: SourceKind,
    }

    #[async_trait]
    impl SpatialSource for FixedSource {
        async fn describe(
            &self,
            _source: &SourceRef,
        ) -> std::result::Result<SourceDescription, SourceError> {
            Ok(SourceDescription {
                kind: self.kind,
                geometry_field: None,
                fields: vec![FieldInfo {
                    name: "ID".to_string(),
                    field_type: "Integer".to_string(),
                }],
                srs: None,
                feature_count: Some(1),
            })
        }
    }

    /// Writes a file for every format except those listed as failing
    #[derive(Default)]
    struct ScriptedWriter {
        failing: BTreeSet<FormatTag>,
        calls: Mutex<Vec<FormatTag>>,
    }

    #[async_trait]
    impl FormatWriter for ScriptedWriter {
        async fn write(&self, request: &WriteRequest) -> std::result::Result<(), FormatExportError> {
            self.calls.lock().unwrap().push(request.format);
            if self.failing.contains(&request.format) {
                return Err(FormatExportError::Writer {
                    format: request.format,
                    message: "driver crashed".to_string(),
                });
            }
            match request.format {
                FormatTag::Shapefile => {
                    std::fs::write(request.destination.with_extension("shp"), "shp").unwrap();
                    std::fs::write(request.destination.with_extension("dbf"), "dbf").unwrap();
                }
                FormatTag::FileGeodatabase => {
                    std::fs::create_dir_all(&request.destination).unwrap();
                    std::fs::write(request.destination.join("gdb"), "x").unwrap();
                }
                _ => std::fs::write(&request.destination, "data").unwrap(),
            }
            Ok(())
        }
    }

    fn coordinator(
        root: &Path,
        kind: SourceKind,
        writer: Arc<ScriptedWriter>,
    ) -> ExportCoordinator {
        let paths = PathsConfig {
            output_root: root.join("out"),
            temp_root: root.join("tmp"),
        };
        ExportCoordinator::new(
            Arc::new(FixedSource { kind }),
            ExporterRegistry::with_writer(writer),
            &paths,
            &ExportConfig::default(),
        )
    }

    fn spec(formats: &[FormatTag]) -> DatasetSpec {
        let mut spec = DatasetSpec::new("Parcel", "Parcels");
        spec.export_formats = formats.iter().copied().collect();
        spec
    }

    #[tokio::test]
    async fn test_run_records_outcomes_and_cleans_temp() {
        let root = TempDir::new().unwrap();
        let writer = Arc::new(ScriptedWriter {
            failing: [FormatTag::Kml].into_iter().collect(),
            ..Default::default()
        });
        let coordinator = coordinator(root.path(), SourceKind::FeatureClass, writer);

        let result = coordinator
            .run(&spec(&[FormatTag::Shapefile, FormatTag::Kml, FormatTag::Csv]))
            .await
            .unwrap();

        assert!(result.is_success(FormatTag::Shapefile));
        assert!(result.is_success(FormatTag::Csv));
        assert_eq!(
            result.get(FormatTag::Kml).unwrap().status,
            ExportStatus::Failed
        );
        assert!(root.path().join("out/parcels/shape/parcels.zip").is_file());
        assert!(!root.path().join("tmp/parcels").exists());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_artifacts() {
        let root = TempDir::new().unwrap();
        let writer = Arc::new(ScriptedWriter::default());
        let coordinator = coordinator(root.path(), SourceKind::FeatureClass, writer);
        let spec = spec(&[FormatTag::GeoJson]);

        let artifact = root.path().join("out/parcels/json/parcels.json");
        coordinator.run(&spec).await.unwrap();
        std::fs::write(&artifact, "stale").unwrap();
        coordinator.run(&spec).await.unwrap();

        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "data");
        assert!(!root.path().join("tmp/parcels").exists());
    }

    #[tokio::test]
    async fn test_table_source_skips_spatial_formats() {
        let root = TempDir::new().unwrap();
        let writer = Arc::new(ScriptedWriter::default());
        let coordinator = coordinator(root.path(), SourceKind::Table, writer.clone());

        let result = coordinator
            .run(&spec(&[FormatTag::Kml, FormatTag::Csv]))
            .await
            .unwrap();

        assert_eq!(
            result.get(FormatTag::Kml).unwrap().status,
            ExportStatus::Skipped
        );
        assert!(result.is_success(FormatTag::Csv));
        assert_eq!(*writer.calls.lock().unwrap(), vec![FormatTag::Csv]);
    }

    #[tokio::test]
    async fn test_all_formats_failing_is_dataset_failure() {
        let root = TempDir::new().unwrap();
        let writer = Arc::new(ScriptedWriter {
            failing: FormatTag::ALL.iter().copied().collect(),
            ..Default::default()
        });
        let coordinator = coordinator(root.path(), SourceKind::FeatureClass, writer);

        let err = coordinator
            .run(&spec(&[FormatTag::Shapefile, FormatTag::Csv]))
            .await
            .unwrap_err();

        match err {
            GeoPublishError::DatasetExport(failure) => {
                assert_eq!(failure.identifier.as_str(), "parcels");
                assert_eq!(failure.attempted, 2);
                assert_eq!(failure.result.failed(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!root.path().join("tmp/parcels").exists());
    }

    #[tokio::test]
    async fn test_collect_existing() {
        let root = TempDir::new().unwrap();
        let writer = Arc::new(ScriptedWriter::default());
        let coordinator = coordinator(root.path(), SourceKind::FeatureClass, writer);

        let csv = root.path().join("out/parcels/csv/parcels.csv");
        std::fs::create_dir_all(csv.parent().unwrap()).unwrap();
        std::fs::write(&csv, "ID\n1\n").unwrap();

        let result = coordinator
            .collect_existing(&spec(&[FormatTag::Csv, FormatTag::Kml]))
            .await
            .unwrap();

        assert!(result.is_success(FormatTag::Csv));
        assert_eq!(
            result.get(FormatTag::Kml).unwrap().status,
            ExportStatus::Skipped
        );
    }
}
