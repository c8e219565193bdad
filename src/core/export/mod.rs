//! Dataset export
//!
//! This module provides the export half of the pipeline:
//! - Format exporters and their registry
//! - Export coordination for one dataset
//! - Archive packaging and scratch workspace helpers
//! - Null marker blanking for KML and GeoJSON output

pub mod coordinator;
pub mod exporters;
pub mod nulls;
pub mod packaging;
pub mod workspace;

pub use coordinator::{collect_artifacts, ExportCoordinator};
pub use exporters::{
    CadExporter, CsvExporter, ExportContext, ExportSettings, ExporterRegistry, FormatExporter,
    GeoJsonExporter, GeodatabaseExporter, KmlExporter, MetadataExporter, ShapefileExporter,
};
pub use workspace::DatasetWorkspace;
