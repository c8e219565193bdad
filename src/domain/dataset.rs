//! Dataset jobs and their enumerations
//!
//! A [`DatasetSpec`] describes one source-to-catalog job. Specs are read from
//! the `[[datasets]]` array of the configuration file and are immutable once
//! constructed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Distribution format of an exported artifact
///
/// The declaration order is the canonical export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FormatTag {
    /// Zipped ESRI shapefile
    Shapefile,
    /// AutoCAD drawing
    Cad,
    /// KML packaged as KMZ
    Kml,
    /// GeoJSON
    GeoJson,
    /// Comma-separated values
    Csv,
    /// Metadata XML document
    Metadata,
    /// Zipped file geodatabase
    FileGeodatabase,
}

impl FormatTag {
    /// All known formats in canonical order
    pub const ALL: [FormatTag; 7] = [
        FormatTag::Shapefile,
        FormatTag::Cad,
        FormatTag::Kml,
        FormatTag::GeoJson,
        FormatTag::Csv,
        FormatTag::Metadata,
        FormatTag::FileGeodatabase,
    ];

    /// Short tag used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shapefile => "shp",
            Self::Cad => "dwg",
            Self::Kml => "kml",
            Self::GeoJson => "json",
            Self::Csv => "csv",
            Self::Metadata => "metadata",
            Self::FileGeodatabase => "gdb",
        }
    }

    /// Subfolder of the dataset output directory holding this artifact
    pub fn subfolder(&self) -> &'static str {
        match self {
            Self::Shapefile => "shape",
            Self::Cad => "cad",
            Self::Kml => "kml",
            Self::GeoJson => "json",
            Self::Csv => "csv",
            Self::Metadata => "metadata",
            Self::FileGeodatabase => "gdb",
        }
    }

    /// Extension of the published artifact
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Shapefile | Self::FileGeodatabase => "zip",
            Self::Cad => "dwg",
            Self::Kml => "kmz",
            Self::GeoJson => "json",
            Self::Csv => "csv",
            Self::Metadata => "xml",
        }
    }

    /// Format label of the catalog resource
    pub fn catalog_label(&self) -> &'static str {
        match self {
            Self::Shapefile => "SHP",
            Self::Cad => "DWG",
            Self::Kml => "KML",
            Self::GeoJson => "JSON",
            Self::Csv => "CSV",
            Self::Metadata => "XML",
            Self::FileGeodatabase => "GDB",
        }
    }

    /// Mimetype of the published artifact
    pub fn mimetype(&self) -> &'static str {
        match self {
            Self::Shapefile | Self::FileGeodatabase => "application/zip",
            Self::Cad => "application/acad",
            Self::Kml => "application/vnd.google-earth.kmz",
            Self::GeoJson => "application/geo+json",
            Self::Csv => "text/csv",
            Self::Metadata => "application/xml",
        }
    }

    /// Human description used for catalog resources
    pub fn description(&self) -> &'static str {
        match self {
            Self::Shapefile => "Shapefile",
            Self::Cad => "AutoCAD DWG",
            Self::Kml => "Google KML",
            Self::GeoJson => "GeoJSON",
            Self::Csv => "Comma-Separated Values",
            Self::Metadata => "Metadata",
            Self::FileGeodatabase => "Esri File Geodatabase",
        }
    }

    /// Whether the format can only be written from a source with geometry
    pub fn is_spatial(&self) -> bool {
        !matches!(self, Self::Csv | Self::Metadata)
    }

    /// Whether the format is written in the fixed map display reference
    pub fn requires_reprojection(&self) -> bool {
        matches!(self, Self::Kml | Self::GeoJson)
    }

    /// Whether the format carries an attribute schema
    pub fn carries_fields(&self) -> bool {
        !matches!(self, Self::Metadata)
    }

    /// Resolves a requested format set, defaulting to all formats when empty
    pub fn resolve(requested: &BTreeSet<FormatTag>) -> BTreeSet<FormatTag> {
        if requested.is_empty() {
            Self::ALL.into_iter().collect()
        } else {
            requested.clone()
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FormatTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shp" | "shape" | "shapefile" => Ok(Self::Shapefile),
            "dwg" | "cad" => Ok(Self::Cad),
            "kml" | "kmz" => Ok(Self::Kml),
            "json" | "geojson" => Ok(Self::GeoJson),
            "csv" => Ok(Self::Csv),
            "metadata" | "xml" => Ok(Self::Metadata),
            "gdb" | "filegdb" => Ok(Self::FileGeodatabase),
            other => Err(format!(
                "Unknown export format '{other}'. Must be one of: shp, dwg, kml, json, csv, metadata, gdb"
            )),
        }
    }
}

impl TryFrom<String> for FormatTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormatTag> for String {
    fn from(tag: FormatTag) -> Self {
        tag.as_str().to_string()
    }
}

/// Oldest file geodatabase release the exported archive must open in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GdbVersion {
    #[serde(rename = "9.2")]
    V9_2,
    #[serde(rename = "9.3")]
    V9_3,
    #[serde(rename = "10.0")]
    V10_0,
    #[default]
    #[serde(rename = "CURRENT", alias = "current")]
    Current,
}

impl GdbVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V9_2 => "9.2",
            Self::V9_3 => "9.3",
            Self::V10_0 => "10.0",
            Self::Current => "CURRENT",
        }
    }
}

impl fmt::Display for GdbVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline stages run for a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionMode {
    /// Export files only
    Export,
    /// Publish already exported files to the catalog
    Publish,
    /// Export then publish
    #[default]
    #[serde(alias = "BOTH")]
    All,
}

impl ExecutionMode {
    pub fn exports(&self) -> bool {
        matches!(self, Self::Export | Self::All)
    }

    pub fn publishes(&self) -> bool {
        matches!(self, Self::Publish | Self::All)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Export => "EXPORT",
            Self::Publish => "PUBLISH",
            Self::All => "ALL",
        };
        f.write_str(s)
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EXPORT" => Ok(Self::Export),
            "PUBLISH" => Ok(Self::Publish),
            "ALL" | "BOTH" => Ok(Self::All),
            other => Err(format!(
                "Invalid execution mode '{other}'. Must be one of: EXPORT, PUBLISH, ALL"
            )),
        }
    }
}

/// Server tier a dataset is published from
///
/// Only production datasets raise alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    #[default]
    Test,
    Prod,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => f.write_str("TEST"),
            Self::Prod => f.write_str("PROD"),
        }
    }
}

/// Per-dataset log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "WARN")]
    Warning,
    Error,
    Critical,
}

impl DatasetLogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

/// Reference to a feature class or table in a source workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Workspace path or connection string; `None` when the feature class
    /// path is self-contained
    pub workspace: Option<String>,

    /// Qualified feature class or table name
    pub feature_class: String,
}

impl SourceRef {
    pub fn new(workspace: Option<String>, feature_class: impl Into<String>) -> Self {
        Self {
            workspace,
            feature_class: feature_class.into(),
        }
    }

    /// Datasource argument for OGR tools
    pub fn datasource(&self) -> &str {
        self.workspace.as_deref().unwrap_or(&self.feature_class)
    }

    /// Layer argument for OGR tools, absent for single-layer sources
    pub fn layer(&self) -> Option<&str> {
        self.workspace.as_ref().map(|_| self.feature_class.as_str())
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.workspace {
            Some(ws) => write!(f, "{}/{}", ws.trim_end_matches(['/', '\\']), self.feature_class),
            None => f.write_str(&self.feature_class),
        }
    }
}

/// One source-to-catalog export/publish job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Workspace path or connection string
    #[serde(default)]
    pub source_workspace: Option<String>,

    /// Qualified feature class or table name
    pub feature_class: String,

    /// Human dataset name; the identifier is derived from it
    pub dataset_name: String,

    /// Fields removed before writing
    #[serde(default)]
    pub exclude_fields: BTreeSet<String>,

    /// Requested formats; empty means all
    #[serde(default)]
    pub export_formats: BTreeSet<FormatTag>,

    #[serde(default)]
    pub gdb_version: GdbVersion,

    #[serde(default, alias = "exe_result")]
    pub execution_mode: ExecutionMode,

    #[serde(default, alias = "build_target")]
    pub environment: Environment,

    #[serde(default)]
    pub log_level: DatasetLogLevel,

    /// Hand-maintained metadata document copied by the metadata exporter
    #[serde(default)]
    pub metadata_path: Option<PathBuf>,
}

impl DatasetSpec {
    /// Creates a spec with defaults for every optional field
    pub fn new(feature_class: impl Into<String>, dataset_name: impl Into<String>) -> Self {
        Self {
            source_workspace: None,
            feature_class: feature_class.into(),
            dataset_name: dataset_name.into(),
            exclude_fields: BTreeSet::new(),
            export_formats: BTreeSet::new(),
            gdb_version: GdbVersion::default(),
            execution_mode: ExecutionMode::default(),
            environment: Environment::default(),
            log_level: DatasetLogLevel::default(),
            metadata_path: None,
        }
    }

    /// Source reference of this dataset
    pub fn source(&self) -> SourceRef {
        SourceRef::new(self.source_workspace.clone(), self.feature_class.clone())
    }

    /// Requested formats after defaulting
    pub fn formats(&self) -> BTreeSet<FormatTag> {
        FormatTag::resolve(&self.export_formats)
    }

    /// Whether `field` is excluded (case-insensitive)
    pub fn is_excluded(&self, field: &str) -> bool {
        self.exclude_fields
            .iter()
            .any(|f| f.trim().eq_ignore_ascii_case(field))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.feature_class.trim().is_empty() {
            return Err(format!(
                "datasets[{}].feature_class cannot be empty",
                self.dataset_name
            ));
        }

        if self.dataset_name.trim().is_empty() {
            return Err("datasets.dataset_name cannot be empty".to_string());
        }

        Ok(())
    }
}
