//! Domain models and types for geopublish.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Dataset specs** ([`DatasetSpec`], [`FormatTag`], [`ExecutionMode`])
//! - **Strongly-typed identifiers** ([`DatasetIdentifier`])
//! - **Pipeline records** ([`ExportResult`], [`MetadataRecord`], [`CatalogEntry`])
//! - **Error types** ([`GeoPublishError`] and the per-stage errors)
//! - **Result type alias** ([`Result`])
//!
//! # Identifiers
//!
//! The dataset identifier is derived from the human dataset name and names
//! both the output folder and the catalog entry:
//!
//! ```rust
//! use geopublish::domain::DatasetIdentifier;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let id = DatasetIdentifier::derive("Road-Centerlines", None)?;
//! assert_eq!(id.as_str(), "road_centerlines");
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod dataset;
pub mod errors;
pub mod export;
pub mod ids;
pub mod metadata;
pub mod result;
pub mod source;

// Re-export commonly used types for convenience
pub use catalog::{
    CatalogEntry, CatalogExtra, CatalogGroup, CatalogResource, CatalogTag, INITIAL_REVISION,
};
pub use dataset::{
    DatasetLogLevel, DatasetSpec, Environment, ExecutionMode, FormatTag, GdbVersion, SourceRef,
};
pub use errors::{
    AlertError, CatalogConsistencyError, CatalogTransportError, DatasetExportFailure,
    FormatExportError, GeoPublishError, MetadataValidationError, SourceError,
};
pub use export::{ExportResult, ExportStatus, FormatOutcome};
pub use ids::DatasetIdentifier;
pub use metadata::{BoundingBox, MetadataRecord};
pub use result::Result;
pub use source::{FieldInfo, SourceDescription, SourceKind};
