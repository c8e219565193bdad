//! End-to-end pipeline tests with in-memory collaborators
//!
//! The spatial source, format writer, catalog and alert channel are replaced
//! by in-memory implementations; exporters, packaging, metadata parsing and
//! reconcile run for real against a temporary output tree.

use async_trait::async_trait;
use geopublish::adapters::alert::{Alert, AlertSeverity, Alerter};
use geopublish::adapters::ckan::{CatalogLookup, CatalogTransport};
use geopublish::adapters::source::SpatialSource;
use geopublish::adapters::writer::{FormatWriter, WriteRequest};
use geopublish::config::{ExportConfig, PathsConfig};
use geopublish::core::catalog::{CatalogReconciler, CatalogSettings};
use geopublish::core::export::{ExportCoordinator, ExporterRegistry};
use geopublish::core::metadata::{MetadataDefaults, MetadataParser};
use geopublish::core::pipeline::{CatalogStatus, PipelineStage, PublishPipeline};
use geopublish::domain::{
    AlertError, CatalogEntry, CatalogTransportError, DatasetSpec, Environment, ExecutionMode,
    ExportStatus, FieldInfo, FormatExportError, FormatTag, SourceDescription, SourceError,
    SourceKind, SourceRef,
};
use geopublish::logging::LevelSwitch;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;

struct FeatureClassSource;

#[async_trait]
impl SpatialSource for FeatureClassSource {
    async fn describe(&self, _source: &SourceRef) -> Result<SourceDescription, SourceError> {
        Ok(SourceDescription {
            kind: SourceKind::FeatureClass,
            geometry_field: Some("Shape".to_string()),
            fields: ["BLDG_ID", "HEIGHT", "TEMP1"]
                .into_iter()
                .map(|name| FieldInfo {
                    name: name.to_string(),
                    field_type: "String".to_string(),
                })
                .collect(),
            srs: Some("EPSG:2232".to_string()),
            feature_count: Some(42),
        })
    }
}

const UNTITLED_METADATA: &str = r#"<?xml version="1.0"?>
<metadata>
  <idinfo>
    <descript><abstract>Outlines of buildings</abstract></descript>
  </idinfo>
</metadata>"#;

/// Writes plausible output for every format, failing those listed
#[derive(Default)]
struct MemoryWriter {
    failing: BTreeSet<FormatTag>,
    requests: Mutex<Vec<WriteRequest>>,
}

impl MemoryWriter {
    fn failing(formats: &[FormatTag]) -> Self {
        Self {
            failing: formats.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn written_fields(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .flat_map(|r| r.fields.clone())
            .collect()
    }
}

#[async_trait]
impl FormatWriter for MemoryWriter {
    async fn write(&self, request: &WriteRequest) -> Result<(), FormatExportError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.format) {
            return Err(FormatExportError::Writer {
                format: request.format,
                message: "driver crashed".to_string(),
            });
        }

        let destination = &request.destination;
        let result = match request.format {
            FormatTag::Shapefile => ["shp", "shx", "dbf", "prj"]
                .into_iter()
                .try_for_each(|ext| std::fs::write(destination.with_extension(ext), ext)),
            FormatTag::FileGeodatabase => std::fs::create_dir_all(destination)
                .and_then(|_| std::fs::write(destination.join("a00000001.gdbtable"), "gdb")),
            FormatTag::Metadata => std::fs::write(destination, UNTITLED_METADATA),
            FormatTag::Csv => std::fs::write(destination, "BLDG_ID,HEIGHT\n1,<Null>\n"),
            _ => std::fs::write(destination, request.layer_name.as_bytes()),
        };
        result.map_err(|e| FormatExportError::io(request.format, e))
    }
}

/// Catalog keyed by entry name, counting every call
#[derive(Default)]
struct MemoryCatalog {
    entries: Mutex<Vec<CatalogEntry>>,
    calls: Mutex<usize>,
}

impl MemoryCatalog {
    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn entry(&self, name: &str) -> Option<CatalogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.name == name)
            .cloned()
    }

    fn count(&self) {
        *self.calls.lock().unwrap() += 1;
    }
}

#[async_trait]
impl CatalogTransport for MemoryCatalog {
    async fn get(&self, identifier: &str) -> Result<CatalogLookup, CatalogTransportError> {
        self.count();
        Ok(match self.entry(identifier) {
            Some(entry) => CatalogLookup::Found(Box::new(entry)),
            None => CatalogLookup::NotFound,
        })
    }

    async fn create(&self, entry: &CatalogEntry) -> Result<String, CatalogTransportError> {
        self.count();
        let mut stored = entry.clone();
        stored.id = Some(format!("pkg-{}", entry.name));
        self.entries.lock().unwrap().push(stored);
        Ok(entry.name.clone())
    }

    async fn update(
        &self,
        identifier: &str,
        entry: &CatalogEntry,
    ) -> Result<u64, CatalogTransportError> {
        self.count();
        let mut entries = self.entries.lock().unwrap();
        let stored = entries
            .iter_mut()
            .find(|e| e.name == identifier)
            .ok_or_else(|| CatalogTransportError::Client {
                status: 404,
                message: "Not found".to_string(),
            })?;
        *stored = entry.clone();
        Ok(entry.revision().unwrap_or_default())
    }

    async fn resolve_group(&self, _name: &str) -> Result<Option<String>, CatalogTransportError> {
        self.count();
        Ok(None)
    }
}

#[derive(Default)]
struct RecordingAlerter {
    sent: Mutex<Vec<Alert>>,
}

#[async_trait]
impl Alerter for RecordingAlerter {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct Harness {
    root: TempDir,
    writer: Arc<MemoryWriter>,
    catalog: Arc<MemoryCatalog>,
    alerter: Arc<RecordingAlerter>,
    pipeline: PublishPipeline,
}

impl Harness {
    fn new(writer: MemoryWriter) -> Self {
        let root = TempDir::new().unwrap();
        let writer = Arc::new(writer);
        let catalog = Arc::new(MemoryCatalog::default());
        let alerter = Arc::new(RecordingAlerter::default());

        let paths = PathsConfig {
            output_root: root.path().join("opendata"),
            temp_root: root.path().join("scratch"),
        };
        let coordinator = ExportCoordinator::new(
            Arc::new(FeatureClassSource),
            ExporterRegistry::with_writer(writer.clone()),
            &paths,
            &ExportConfig::default(),
        );
        let parser = MetadataParser::new(MetadataDefaults {
            maintainer: Some("GIS Department".to_string()),
            maintainer_email: Some("gis@example.org".to_string()),
            ..Default::default()
        })
        .unwrap();
        let reconciler = CatalogReconciler::new(
            catalog.clone(),
            CatalogSettings {
                download_base_url: Url::parse("https://downloads.example.org/opendata/").unwrap(),
                license_id: Some("cc-by".to_string()),
                group: None,
                owner_org: None,
                maintainer: None,
                maintainer_email: None,
                author: None,
            },
        );

        let pipeline = PublishPipeline::new(
            coordinator,
            parser,
            Some(reconciler),
            alerter.clone(),
            LevelSwitch::disabled(),
        );

        Self {
            root,
            writer,
            catalog,
            alerter,
            pipeline,
        }
    }

    fn output(&self) -> &Path {
        self.root.path()
    }

    fn alerts(&self) -> Vec<Alert> {
        self.alerter.sent.lock().unwrap().clone()
    }
}

fn building_footprints() -> DatasetSpec {
    let mut spec = DatasetSpec::new("BuildingFootprint", "BuildingFootprints");
    spec.source_workspace = Some("/data/county.gdb".to_string());
    spec.export_formats = [FormatTag::Shapefile, FormatTag::Kml].into_iter().collect();
    spec.exclude_fields = ["TEMP1".to_string()].into_iter().collect();
    spec.execution_mode = ExecutionMode::All;
    spec
}

#[tokio::test]
async fn test_building_footprints_create_then_update() {
    let harness = Harness::new(MemoryWriter::default());
    let spec = building_footprints();

    let summary = harness.pipeline.run(std::slice::from_ref(&spec)).await;
    assert!(summary.is_successful(), "{:?}", summary.datasets[0].errors);

    let report = summary.report("BuildingFootprints").unwrap();
    assert_eq!(report.identifier.as_ref().unwrap().as_str(), "buildingfootprints");
    assert_eq!(report.catalog, CatalogStatus::Created { revision: 1 });
    assert!(harness
        .output()
        .join("opendata/buildingfootprints/shape/buildingfootprints.zip")
        .is_file());
    assert!(harness
        .output()
        .join("opendata/buildingfootprints/kml/buildingfootprints.kmz")
        .is_file());
    assert!(!harness.output().join("scratch/buildingfootprints").exists());

    let summary = harness.pipeline.run(std::slice::from_ref(&spec)).await;
    let report = summary.report("BuildingFootprints").unwrap();
    assert_eq!(report.catalog, CatalogStatus::Updated { revision: 2 });

    let entry = harness.catalog.entry("buildingfootprints").unwrap();
    assert_eq!(entry.revision(), Some(2));
    assert_eq!(entry.resources.len(), 2);
    assert!(entry.resource_by_format("SHP").is_some());
    assert!(entry.resource_by_format("KML").is_some());
    assert!(!entry.resources.iter().any(|r| r.format == "CSV"));
}

#[tokio::test]
async fn test_excluded_fields_never_reach_writer() {
    let harness = Harness::new(MemoryWriter::default());
    let mut spec = building_footprints();
    spec.export_formats = [FormatTag::Shapefile, FormatTag::Csv].into_iter().collect();
    spec.execution_mode = ExecutionMode::Export;

    harness.pipeline.run(&[spec]).await;

    let fields = harness.writer.written_fields();
    assert!(fields.contains(&"BLDG_ID".to_string()));
    assert!(!fields.iter().any(|f| f.eq_ignore_ascii_case("TEMP1")));
}

#[tokio::test]
async fn test_export_mode_makes_no_catalog_calls() {
    let harness = Harness::new(MemoryWriter::default());
    let mut spec = building_footprints();
    spec.execution_mode = ExecutionMode::Export;

    let summary = harness.pipeline.run(&[spec]).await;

    assert!(summary.is_successful());
    assert_eq!(summary.datasets[0].catalog, CatalogStatus::NotAttempted);
    assert_eq!(harness.catalog.calls(), 0);
}

#[tokio::test]
async fn test_publish_mode_uses_artifacts_on_disk() {
    let harness = Harness::new(MemoryWriter::default());
    let mut spec = building_footprints();

    spec.execution_mode = ExecutionMode::Export;
    harness.pipeline.run(std::slice::from_ref(&spec)).await;
    let writes = harness.writer.requests.lock().unwrap().len();

    spec.execution_mode = ExecutionMode::Publish;
    let summary = harness.pipeline.run(&[spec]).await;

    assert_eq!(
        summary.datasets[0].catalog,
        CatalogStatus::Created { revision: 1 }
    );
    assert_eq!(harness.writer.requests.lock().unwrap().len(), writes);
}

#[tokio::test]
async fn test_publish_without_artifacts_fails() {
    let harness = Harness::new(MemoryWriter::default());
    let mut spec = building_footprints();
    spec.execution_mode = ExecutionMode::Publish;

    let summary = harness.pipeline.run(&[spec]).await;

    let report = &summary.datasets[0];
    assert!(report.is_failed());
    assert_eq!(report.errors[0].stage, PipelineStage::Export);
    assert_eq!(harness.catalog.calls(), 0);
}

#[tokio::test]
async fn test_missing_title_skips_reconcile() {
    let harness = Harness::new(MemoryWriter::default());
    let mut spec = building_footprints();
    spec.export_formats = [FormatTag::Csv, FormatTag::Metadata].into_iter().collect();

    let summary = harness.pipeline.run(&[spec]).await;

    let report = &summary.datasets[0];
    assert!(report.is_failed());
    assert_eq!(report.errors[0].stage, PipelineStage::Metadata);
    assert!(report.errors[0].message.contains("title"));
    assert_eq!(report.catalog, CatalogStatus::NotAttempted);
    assert_eq!(harness.catalog.calls(), 0);
}

#[tokio::test]
async fn test_all_formats_failing_stops_dataset() {
    let harness = Harness::new(MemoryWriter::failing(&[FormatTag::Shapefile, FormatTag::Kml]));
    let spec = building_footprints();

    let summary = harness.pipeline.run(&[spec]).await;

    let report = &summary.datasets[0];
    assert!(report.is_failed());
    assert_eq!(report.errors[0].stage, PipelineStage::Export);
    let export = report.export.as_ref().unwrap();
    assert_eq!(export.failed(), 2);
    assert_eq!(
        export.get(FormatTag::Kml).unwrap().status,
        ExportStatus::Failed
    );
    assert_eq!(harness.catalog.calls(), 0);
}

#[tokio::test]
async fn test_failure_does_not_stop_batch() {
    let harness = Harness::new(MemoryWriter::failing(&[FormatTag::Kml]));
    let mut failing = building_footprints();
    failing.export_formats = [FormatTag::Kml].into_iter().collect();
    let mut parcels = DatasetSpec::new("Parcel", "Parcels");
    parcels.export_formats = [FormatTag::Csv].into_iter().collect();

    let summary = harness.pipeline.run(&[failing, parcels]).await;

    assert_eq!(summary.total(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(
        summary.report("Parcels").unwrap().catalog,
        CatalogStatus::Created { revision: 1 }
    );
}

#[tokio::test]
async fn test_test_environment_never_alerts() {
    let harness = Harness::new(MemoryWriter::failing(&[FormatTag::Shapefile, FormatTag::Kml]));
    let mut spec = building_footprints();
    spec.environment = Environment::Test;

    let summary = harness.pipeline.run(&[spec]).await;

    assert_eq!(summary.failed(), 1);
    assert!(summary.alert.is_none());
    assert!(harness.alerts().is_empty());
}

#[tokio::test]
async fn test_production_failure_raises_error_alert() {
    let harness = Harness::new(MemoryWriter::failing(&[FormatTag::Shapefile, FormatTag::Kml]));
    let mut spec = building_footprints();
    spec.environment = Environment::Prod;

    let summary = harness.pipeline.run(&[spec]).await;

    assert_eq!(summary.alert, Some(AlertSeverity::Error));
    let alerts = harness.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Error);
    assert_eq!(alerts[0].datasets, vec!["buildingfootprints".to_string()]);
}

#[tokio::test]
async fn test_production_degraded_raises_warning_alert() {
    let harness = Harness::new(MemoryWriter::failing(&[FormatTag::Kml]));
    let mut spec = building_footprints();
    spec.environment = Environment::Prod;

    let summary = harness.pipeline.run(&[spec]).await;

    assert_eq!(summary.degraded(), 1);
    assert_eq!(
        summary.datasets[0].catalog,
        CatalogStatus::Created { revision: 1 }
    );
    let alerts = harness.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    assert!(alerts[0].body.contains("kml"));
}
