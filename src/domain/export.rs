//! Per-dataset export result

use crate::domain::dataset::FormatTag;
use crate::domain::errors::FormatExportError;
use crate::domain::ids::DatasetIdentifier;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome status of one format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Failed => f.write_str("FAILED"),
            Self::Skipped => f.write_str("SKIPPED"),
        }
    }
}

/// Outcome of one format exporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOutcome {
    /// Canonical artifact path (set even when the export failed)
    pub artifact_path: PathBuf,

    pub status: ExportStatus,

    /// Failure cause for FAILED entries
    pub error: Option<FormatExportError>,

    /// Reason for SKIPPED entries
    pub note: Option<String>,
}

impl FormatOutcome {
    pub fn success(artifact_path: PathBuf) -> Self {
        Self {
            artifact_path,
            status: ExportStatus::Success,
            error: None,
            note: None,
        }
    }

    pub fn failed(artifact_path: PathBuf, error: FormatExportError) -> Self {
        Self {
            artifact_path,
            status: ExportStatus::Failed,
            error: Some(error),
            note: None,
        }
    }

    pub fn skipped(artifact_path: PathBuf, note: impl Into<String>) -> Self {
        Self {
            artifact_path,
            status: ExportStatus::Skipped,
            error: None,
            note: Some(note.into()),
        }
    }
}

/// Mapping from format tag to outcome for one dataset run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub identifier: DatasetIdentifier,

    /// Dataset output directory `<output_root>/<identifier>`
    pub dataset_dir: PathBuf,

    outcomes: BTreeMap<FormatTag, FormatOutcome>,
}

impl ExportResult {
    pub fn new(identifier: DatasetIdentifier, dataset_dir: PathBuf) -> Self {
        Self {
            identifier,
            dataset_dir,
            outcomes: BTreeMap::new(),
        }
    }

    /// Canonical artifact path of `format` below `dataset_dir`
    ///
    /// `<dataset_dir>/<subfolder>/<identifier>.<ext>`
    pub fn artifact_path(
        dataset_dir: &Path,
        identifier: &DatasetIdentifier,
        format: FormatTag,
    ) -> PathBuf {
        dataset_dir
            .join(format.subfolder())
            .join(format!("{}.{}", identifier, format.extension()))
    }

    pub fn record(&mut self, format: FormatTag, outcome: FormatOutcome) {
        self.outcomes.insert(format, outcome);
    }

    pub fn get(&self, format: FormatTag) -> Option<&FormatOutcome> {
        self.outcomes.get(&format)
    }

    /// Outcomes in canonical format order
    pub fn iter(&self) -> impl Iterator<Item = (FormatTag, &FormatOutcome)> {
        self.outcomes.iter().map(|(tag, outcome)| (*tag, outcome))
    }

    /// Successful artifacts in canonical format order
    pub fn artifacts(&self) -> impl Iterator<Item = (FormatTag, &Path)> {
        self.iter()
            .filter(|(_, o)| o.status == ExportStatus::Success)
            .map(|(tag, o)| (tag, o.artifact_path.as_path()))
    }

    pub fn is_success(&self, format: FormatTag) -> bool {
        self.get(format)
            .is_some_and(|o| o.status == ExportStatus::Success)
    }

    pub fn count(&self, status: ExportStatus) -> usize {
        self.outcomes.values().filter(|o| o.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(ExportStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(ExportStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ExportStatus::Skipped)
    }

    pub fn has_artifacts(&self) -> bool {
        self.succeeded() > 0
    }

    /// At least one artifact succeeded and at least one format failed
    pub fn is_degraded(&self) -> bool {
        self.has_artifacts() && self.failed() > 0
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
