//! Format exporters
//!
//! One [`FormatExporter`] per [`FormatTag`]. Each exporter writes into its own
//! scratch folder `<dataset temp>/<subfolder>`, packages the written files
//! into a single artifact where the format needs one, and copies the
//! artifact to `<output>/<id>/<subfolder>/<id>.<ext>`. KML and GeoJSON
//! attribute values holding a literal `<Null>` marker are blanked before
//! publishing.

use super::{nulls, packaging};
use super::workspace::recreate_dir;
use crate::adapters::writer::{FormatWriter, Reprojection, WriteRequest};
use crate::config::ExportConfig;
use crate::domain::{
    DatasetIdentifier, DatasetSpec, ExportResult, FormatExportError, FormatTag,
    SourceDescription,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Attribute columns holding derived geometry measures
const SHAPE_FIELDS: [&str; 3] = ["Shape", "Shape_Length", "Shape_Area"];

/// Reprojection settings shared by all datasets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub map_srs: String,
    pub transformation: Option<String>,
}

impl From<&ExportConfig> for ExportSettings {
    fn from(config: &ExportConfig) -> Self {
        Self {
            map_srs: config.map_srs.clone(),
            transformation: config.transformation.clone(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

/// Inputs of one format export
#[derive(Debug, Clone, Copy)]
pub struct ExportContext<'a> {
    pub spec: &'a DatasetSpec,
    pub identifier: &'a DatasetIdentifier,
    pub description: &'a SourceDescription,

    /// `<output_root>/<id>`
    pub dataset_dir: &'a Path,

    /// `<temp_root>/<id>`
    pub temp_dir: &'a Path,

    pub settings: &'a ExportSettings,
}

impl ExportContext<'_> {
    pub fn artifact_path(&self, format: FormatTag) -> PathBuf {
        ExportResult::artifact_path(self.dataset_dir, self.identifier, format)
    }

    /// Source fields written for `format`, without excluded fields
    ///
    /// CSV additionally drops the geometry column and the derived shape
    /// measure columns.
    pub fn retained_fields(&self, format: FormatTag) -> Vec<String> {
        let geometry = self.description.geometry_field.as_deref();
        self.description.retained_fields(|field| {
            if self.spec.is_excluded(field) {
                return true;
            }
            format == FormatTag::Csv
                && (geometry.is_some_and(|g| g.eq_ignore_ascii_case(field))
                    || SHAPE_FIELDS.iter().any(|s| s.eq_ignore_ascii_case(field)))
        })
    }

    pub fn write_request(&self, format: FormatTag, destination: PathBuf) -> WriteRequest {
        let reprojection = format.requires_reprojection().then(|| Reprojection {
            target_srs: self.settings.map_srs.clone(),
            transformation: self.settings.transformation.clone(),
        });

        WriteRequest {
            format,
            source: self.spec.source(),
            fields: if format.carries_fields() {
                self.retained_fields(format)
            } else {
                Vec::new()
            },
            excluded: self.spec.exclude_fields.clone(),
            destination,
            reprojection,
            gdb_version: self.spec.gdb_version,
            layer_name: self.identifier.to_string(),
            metadata_path: self.spec.metadata_path.clone(),
        }
    }

    /// Recreates `<temp>/<subfolder>` for `format`
    async fn scratch_dir(&self, format: FormatTag) -> Result<PathBuf, FormatExportError> {
        let dir = self.temp_dir.join(format.subfolder());
        recreate_dir(&dir)
            .await
            .map_err(|e| FormatExportError::io(format, e))?;
        Ok(dir)
    }

    fn require_spatial(&self, format: FormatTag) -> Result<(), FormatExportError> {
        if format.is_spatial() && !self.description.is_spatial() {
            return Err(FormatExportError::SourceKind { format });
        }
        Ok(())
    }

    /// Copies the staged artifact to its canonical path, overwriting
    async fn publish(&self, format: FormatTag, staged: &Path) -> Result<PathBuf, FormatExportError> {
        let artifact = self.artifact_path(format);
        if let Some(parent) = artifact.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FormatExportError::io(format, e))?;
        }

        tokio::fs::copy(staged, &artifact)
            .await
            .map_err(|e| FormatExportError::io(format, format!("{}: {}", staged.display(), e)))?;

        tracing::debug!(
            format = %format,
            artifact = %artifact.display(),
            "Published artifact"
        );
        Ok(artifact)
    }
}

/// Converts one source dataset into one artifact
#[async_trait]
pub trait FormatExporter: Send + Sync {
    fn format(&self) -> FormatTag;

    /// Exports the dataset and returns the canonical artifact path
    async fn export(&self, ctx: &ExportContext<'_>) -> Result<PathBuf, FormatExportError>;
}

/// Runs blocking packaging work off the async threads
async fn blocking<T, F>(format: FormatTag, work: F) -> Result<T, FormatExportError>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| FormatExportError::Packaging {
            format,
            message: e.to_string(),
        })?
        .map_err(|e| FormatExportError::Packaging {
            format,
            message: e.to_string(),
        })
}

/// Writes one file and publishes it unchanged
async fn export_single_file(
    writer: &dyn FormatWriter,
    format: FormatTag,
    ctx: &ExportContext<'_>,
) -> Result<PathBuf, FormatExportError> {
    let work = ctx.scratch_dir(format).await?;
    let staged = work.join(format!("{}.{}", ctx.identifier, format.extension()));

    writer.write(&ctx.write_request(format, staged.clone())).await?;
    ctx.publish(format, &staged).await
}

/// Zipped ESRI shapefile
pub struct ShapefileExporter {
    writer: Arc<dyn FormatWriter>,
}

impl ShapefileExporter {
    pub fn new(writer: Arc<dyn FormatWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl FormatExporter for ShapefileExporter {
    fn format(&self) -> FormatTag {
        FormatTag::Shapefile
    }

    async fn export(&self, ctx: &ExportContext<'_>) -> Result<PathBuf, FormatExportError> {
        let format = self.format();
        ctx.require_spatial(format)?;

        let work = ctx.scratch_dir(format).await?;
        let stem = ctx.identifier.to_string();
        self.writer
            .write(&ctx.write_request(format, work.join(format!("{stem}.shp"))))
            .await?;

        let archive = work.join(format!("{stem}.zip"));
        let target = archive.clone();
        blocking(format, move || {
            let files = packaging::files_with_stem(&work, &stem)?;
            if files.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("writer produced no {stem}.* files"),
                ));
            }
            packaging::zip_files(&files, &target)
        })
        .await?;

        ctx.publish(format, &archive).await
    }
}

/// AutoCAD drawing
pub struct CadExporter {
    writer: Arc<dyn FormatWriter>,
}

impl CadExporter {
    pub fn new(writer: Arc<dyn FormatWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl FormatExporter for CadExporter {
    fn format(&self) -> FormatTag {
        FormatTag::Cad
    }

    async fn export(&self, ctx: &ExportContext<'_>) -> Result<PathBuf, FormatExportError> {
        ctx.require_spatial(self.format())?;
        export_single_file(self.writer.as_ref(), self.format(), ctx).await
    }
}

/// KML packaged as KMZ
pub struct KmlExporter {
    writer: Arc<dyn FormatWriter>,
}

impl KmlExporter {
    /// Entry name of the main document inside a KMZ
    pub const DOCUMENT: &'static str = "doc.kml";

    pub fn new(writer: Arc<dyn FormatWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl FormatExporter for KmlExporter {
    fn format(&self) -> FormatTag {
        FormatTag::Kml
    }

    async fn export(&self, ctx: &ExportContext<'_>) -> Result<PathBuf, FormatExportError> {
        let format = self.format();
        ctx.require_spatial(format)?;

        let work = ctx.scratch_dir(format).await?;
        self.writer
            .write(&ctx.write_request(format, work.join(Self::DOCUMENT)))
            .await?;

        // KMZ readers expect the document as the first entry
        let archive = ctx.temp_dir.join(format!("{}.kmz", ctx.identifier));
        let target = archive.clone();
        blocking(format, move || {
            let document = work.join(Self::DOCUMENT);
            if !document.is_file() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("writer produced no {}", Self::DOCUMENT),
                ));
            }
            let blanked = nulls::blank_kml_nulls(&document)?;
            if blanked > 0 {
                tracing::debug!(values = blanked, "Blanked null markers in KML");
            }

            let mut files = vec![document.clone()];
            for entry in std::fs::read_dir(&work)? {
                let path = entry?.path();
                if path.is_file() && path != document {
                    files.push(path);
                }
            }
            files[1..].sort();
            packaging::zip_files(&files, &target)
        })
        .await?;

        ctx.publish(format, &archive).await
    }
}

/// GeoJSON in the map display reference system
pub struct GeoJsonExporter {
    writer: Arc<dyn FormatWriter>,
}

impl GeoJsonExporter {
    pub fn new(writer: Arc<dyn FormatWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl FormatExporter for GeoJsonExporter {
    fn format(&self) -> FormatTag {
        FormatTag::GeoJson
    }

    async fn export(&self, ctx: &ExportContext<'_>) -> Result<PathBuf, FormatExportError> {
        let format = self.format();
        ctx.require_spatial(format)?;

        let work = ctx.scratch_dir(format).await?;
        let staged = work.join(format!("{}.{}", ctx.identifier, format.extension()));
        self.writer
            .write(&ctx.write_request(format, staged.clone()))
            .await?;

        let target = staged.clone();
        let blanked = blocking(format, move || nulls::blank_geojson_nulls(&target)).await?;
        if blanked > 0 {
            tracing::debug!(values = blanked, "Blanked null markers in GeoJSON");
        }

        ctx.publish(format, &staged).await
    }
}

/// Attribute table as CSV
pub struct CsvExporter {
    writer: Arc<dyn FormatWriter>,
}

impl CsvExporter {
    pub fn new(writer: Arc<dyn FormatWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl FormatExporter for CsvExporter {
    fn format(&self) -> FormatTag {
        FormatTag::Csv
    }

    async fn export(&self, ctx: &ExportContext<'_>) -> Result<PathBuf, FormatExportError> {
        export_single_file(self.writer.as_ref(), self.format(), ctx).await
    }
}

/// Metadata XML document
pub struct MetadataExporter {
    writer: Arc<dyn FormatWriter>,
}

impl MetadataExporter {
    pub fn new(writer: Arc<dyn FormatWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl FormatExporter for MetadataExporter {
    fn format(&self) -> FormatTag {
        FormatTag::Metadata
    }

    async fn export(&self, ctx: &ExportContext<'_>) -> Result<PathBuf, FormatExportError> {
        export_single_file(self.writer.as_ref(), self.format(), ctx).await
    }
}

/// File geodatabase zipped under `<id>.gdb/`
pub struct GeodatabaseExporter {
    writer: Arc<dyn FormatWriter>,
}

impl GeodatabaseExporter {
    pub fn new(writer: Arc<dyn FormatWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl FormatExporter for GeodatabaseExporter {
    fn format(&self) -> FormatTag {
        FormatTag::FileGeodatabase
    }

    async fn export(&self, ctx: &ExportContext<'_>) -> Result<PathBuf, FormatExportError> {
        let format = self.format();
        ctx.require_spatial(format)?;

        let work = ctx.scratch_dir(format).await?;
        let gdb_name = format!("{}.gdb", ctx.identifier);
        let gdb_dir = work.join(&gdb_name);
        self.writer
            .write(&ctx.write_request(format, gdb_dir.clone()))
            .await?;

        let archive = work.join(format!("{}.zip", ctx.identifier));
        let target = archive.clone();
        blocking(format, move || {
            if !gdb_dir.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("writer produced no {gdb_name} directory"),
                ));
            }
            packaging::zip_directory(&gdb_dir, &gdb_name, &target, packaging::is_lock_file)
        })
        .await?;

        ctx.publish(format, &archive).await
    }
}

/// Format exporters keyed by format tag
#[derive(Default)]
pub struct ExporterRegistry {
    exporters: BTreeMap<FormatTag, Box<dyn FormatExporter>>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with an exporter for every known format
    pub fn with_writer(writer: Arc<dyn FormatWriter>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ShapefileExporter::new(writer.clone())));
        registry.register(Box::new(CadExporter::new(writer.clone())));
        registry.register(Box::new(KmlExporter::new(writer.clone())));
        registry.register(Box::new(GeoJsonExporter::new(writer.clone())));
        registry.register(Box::new(CsvExporter::new(writer.clone())));
        registry.register(Box::new(MetadataExporter::new(writer.clone())));
        registry.register(Box::new(GeodatabaseExporter::new(writer)));
        registry
    }

    /// Registers `exporter`, replacing any exporter of the same format
    pub fn register(&mut self, exporter: Box<dyn FormatExporter>) {
        self.exporters.insert(exporter.format(), exporter);
    }

    pub fn get(&self, format: FormatTag) -> Option<&dyn FormatExporter> {
        self.exporters.get(&format).map(|e| e.as_ref())
    }

    pub fn formats(&self) -> impl Iterator<Item = FormatTag> + '_ {
        self.exporters.keys().copied()
    }
}
