//! Domain error types
//!
//! This module defines the error hierarchy for geopublish. Per-format errors
//! are recorded and never abort sibling formats; the remaining kinds are fatal
//! to one dataset but never to the batch.

use crate::domain::dataset::FormatTag;
use crate::domain::export::ExportResult;
use crate::domain::ids::DatasetIdentifier;
use thiserror::Error;

/// Main geopublish error type
#[derive(Debug, Error)]
pub enum GeoPublishError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Spatial source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A single format failed to export
    #[error("Format export error: {0}")]
    FormatExport(#[from] FormatExportError),

    /// Every requested format failed for a dataset
    #[error(transparent)]
    DatasetExport(#[from] DatasetExportFailure),

    /// Metadata could not be read or is missing required fields
    #[error("Metadata validation error: {0}")]
    MetadataValidation(#[from] MetadataValidationError),

    /// Catalog transport errors
    #[error("Catalog transport error: {0}")]
    CatalogTransport(#[from] CatalogTransportError),

    /// Ambiguous remote catalog state
    #[error(transparent)]
    CatalogConsistency(#[from] CatalogConsistencyError),

    /// Alert delivery errors
    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors raised while describing a spatial source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The describe tool could not be started
    #[error("Failed to launch {tool}: {message}")]
    Launch { tool: String, message: String },

    /// The describe tool exited unsuccessfully
    #[error("Failed to describe {source_ref}: {message}")]
    DescribeFailed { source_ref: String, message: String },

    /// The source has no layer with the requested name
    #[error("Layer not found in {0}")]
    LayerNotFound(String),

    /// The describe output could not be parsed
    #[error("Invalid source description: {0}")]
    InvalidDescription(String),
}

/// Per-format export failure
///
/// Recorded in the dataset's `ExportResult`; never aborts sibling formats.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatExportError {
    /// No writer backend is available for this format
    #[error("{format} export is not supported: {reason}")]
    Unsupported { format: FormatTag, reason: String },

    /// The source kind cannot be written in this format
    #[error("{format} export requires a spatial source")]
    SourceKind { format: FormatTag },

    /// The format writer reported a failure
    #[error("{format} writer failed: {message}")]
    Writer { format: FormatTag, message: String },

    /// Packaging the written files into one artifact failed
    #[error("{format} packaging failed: {message}")]
    Packaging { format: FormatTag, message: String },

    /// Filesystem error while staging or publishing the artifact
    #[error("{format} I/O error: {message}")]
    Io { format: FormatTag, message: String },
}

impl FormatExportError {
    /// Format the error belongs to
    pub fn format(&self) -> FormatTag {
        match self {
            Self::Unsupported { format, .. }
            | Self::SourceKind { format }
            | Self::Writer { format, .. }
            | Self::Packaging { format, .. }
            | Self::Io { format, .. } => *format,
        }
    }

    /// Wrap an I/O error for the given format
    pub fn io(format: FormatTag, err: impl std::fmt::Display) -> Self {
        Self::Io {
            format,
            message: err.to_string(),
        }
    }
}

/// No requested format produced an artifact for one dataset
///
/// Every format either failed or was skipped. Carries the full per-format
/// result so callers can still report what was attempted.
#[derive(Debug, Error)]
#[error(
    "No artifact produced for dataset {identifier}: {} of {attempted} requested formats failed, {} skipped",
    .result.failed(),
    .result.skipped()
)]
pub struct DatasetExportFailure {
    /// Dataset identifier
    pub identifier: DatasetIdentifier,

    /// Number of formats attempted
    pub attempted: usize,

    /// Per-format outcome
    pub result: ExportResult,
}

/// Metadata document errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetadataValidationError {
    /// The document could not be read
    #[error("Failed to read metadata document {path}: {message}")]
    Unreadable { path: String, message: String },

    /// The document is not well-formed XML
    #[error("Malformed metadata document: {0}")]
    Malformed(String),

    /// Required fields are absent or empty
    #[error("Metadata is missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
}

/// Catalog transport errors
///
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogTransportError {
    /// Failed to connect to the catalog
    #[error("Failed to connect to catalog: {0}")]
    Connection(String),

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    Client { status: u16, message: String },

    /// The catalog answered but refused the action
    #[error("Catalog rejected request: {0}")]
    Rejected(String),

    /// The response body did not match the expected shape
    #[error("Invalid response from catalog: {0}")]
    InvalidResponse(String),
}

impl CatalogTransportError {
    /// Whether retrying the request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::Server { .. }
        )
    }
}

/// Remote catalog state the reconciler refuses to act on
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogConsistencyError {
    /// More than one remote entry claims the same identifier
    #[error("Catalog returned {matches} entries for identifier {identifier}")]
    Ambiguous { identifier: String, matches: usize },

    /// The stored revision has no successor
    #[error("Stored revision {revision} of {identifier} cannot be incremented")]
    RevisionExhausted { identifier: String, revision: u64 },
}

/// Alert delivery errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AlertError {
    /// The alert endpoint could not be reached
    #[error("Failed to deliver alert: {0}")]
    Delivery(String),

    /// The alert endpoint refused the alert
    #[error("Alert endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },
}

// Conversion from std::io::Error
impl From<std::io::Error> for GeoPublishError {
    fn from(err: std::io::Error) -> Self {
        GeoPublishError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for GeoPublishError {
    fn from(err: serde_json::Error) -> Self {
        GeoPublishError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for GeoPublishError {
    fn from(err: toml::de::Error) -> Self {
        GeoPublishError::Configuration(format!("TOML parse error: {err}"))
    }
}
