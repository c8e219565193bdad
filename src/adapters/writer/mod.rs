//! Low-level format writers
//!
//! A [`FormatWriter`] turns one source layer into files of one format at a
//! destination path. Packaging the files into a single distributable
//! artifact is left to the format exporters in `core::export`.

pub mod process;

use crate::domain::{FormatExportError, FormatTag, GdbVersion, SourceRef};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub use process::ProcessWriter;

/// Target reference system for map display formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reprojection {
    /// Authority code or WKT, e.g. `EPSG:4326`
    pub target_srs: String,

    /// Datum transformation, passed through to the writer
    pub transformation: Option<String>,
}

/// One write of a source layer in one format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub format: FormatTag,
    pub source: SourceRef,

    /// Attribute fields to write, in source order
    pub fields: Vec<String>,

    /// Fields removed from the source schema
    pub excluded: BTreeSet<String>,

    /// File (or directory, for geodatabases) the writer creates
    pub destination: PathBuf,

    pub reprojection: Option<Reprojection>,
    pub gdb_version: GdbVersion,

    /// Name of the written layer
    pub layer_name: String,

    /// Hand-maintained metadata document of the dataset
    pub metadata_path: Option<PathBuf>,
}

/// Writes a source layer in one format
#[async_trait]
pub trait FormatWriter: Send + Sync {
    /// Writes `request.source` to `request.destination`
    ///
    /// # Errors
    ///
    /// Returns [`FormatExportError::Unsupported`] when no backend can write
    /// the format, or [`FormatExportError::Writer`] when the backend fails.
    async fn write(&self, request: &WriteRequest) -> Result<(), FormatExportError>;
}
