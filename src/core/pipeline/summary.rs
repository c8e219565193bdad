//! Batch summary and reporting
//!
//! This module defines structures for tracking and reporting pipeline
//! results per dataset and per batch.

use crate::adapters::alert::AlertSeverity;
use crate::core::catalog::ReconcileOutcome;
use crate::domain::{
    DatasetIdentifier, DatasetSpec, Environment, ExecutionMode, ExportResult, GeoPublishError,
};
use std::fmt;
use std::time::Duration;

/// State of the catalog entry after a dataset run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogStatus {
    Created { revision: u64 },
    Updated { revision: u64 },
    Failed,
    NotAttempted,
}

impl From<&ReconcileOutcome> for CatalogStatus {
    fn from(outcome: &ReconcileOutcome) -> Self {
        match outcome {
            ReconcileOutcome::Created { revision } => Self::Created {
                revision: *revision,
            },
            ReconcileOutcome::Updated { revision } => Self::Updated {
                revision: *revision,
            },
            ReconcileOutcome::Failed(_) => Self::Failed,
        }
    }
}

impl fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { revision } => write!(f, "CREATED (revision {revision})"),
            Self::Updated { revision } => write!(f, "UPDATED (revision {revision})"),
            Self::Failed => f.write_str("FAILED"),
            Self::NotAttempted => f.write_str("NOT ATTEMPTED"),
        }
    }
}

/// Pipeline stage an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Identifier derivation or missing configuration
    Configuration,
    /// Spatial source description
    Source,
    /// Format export and packaging
    Export,
    /// Metadata parsing
    Metadata,
    /// Catalog reconcile
    Catalog,
    /// Alert delivery
    Alert,
}

impl PipelineStage {
    /// Stage a dataset-level error belongs to
    pub fn of(error: &GeoPublishError) -> Self {
        match error {
            GeoPublishError::Configuration(_) | GeoPublishError::Validation(_) => {
                Self::Configuration
            }
            GeoPublishError::Source(_) => Self::Source,
            GeoPublishError::FormatExport(_)
            | GeoPublishError::DatasetExport(_)
            | GeoPublishError::Io(_)
            | GeoPublishError::Serialization(_) => Self::Export,
            GeoPublishError::MetadataValidation(_) => Self::Metadata,
            GeoPublishError::CatalogTransport(_) | GeoPublishError::CatalogConsistency(_) => {
                Self::Catalog
            }
            GeoPublishError::Alert(_) => Self::Alert,
        }
    }
}

/// Pipeline error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub message: String,

    /// Optional context (e.g. dataset identifier)
    pub context: Option<String>,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl From<&GeoPublishError> for PipelineError {
    fn from(error: &GeoPublishError) -> Self {
        Self::new(PipelineStage::of(error), error.to_string())
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.stage, self.message)?;
        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }
        Ok(())
    }
}

/// Outcome of one dataset run
#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub dataset_name: String,
    pub identifier: Option<DatasetIdentifier>,
    pub environment: Environment,
    pub mode: ExecutionMode,

    /// Export result, from this run or collected from disk
    pub export: Option<ExportResult>,

    pub catalog: CatalogStatus,
    pub errors: Vec<PipelineError>,
}

impl DatasetReport {
    pub fn new(spec: &DatasetSpec) -> Self {
        Self {
            dataset_name: spec.dataset_name.clone(),
            identifier: None,
            environment: spec.environment,
            mode: spec.execution_mode,
            export: None,
            catalog: CatalogStatus::NotAttempted,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: PipelineError) {
        self.errors.push(error);
    }

    /// The dataset hit an error fatal to it
    pub fn is_failed(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The dataset completed but some formats failed
    pub fn is_degraded(&self) -> bool {
        !self.is_failed() && self.export.as_ref().is_some_and(ExportResult::is_degraded)
    }

    /// Label used in logs and alerts: the identifier when derived
    pub fn label(&self) -> String {
        self.identifier
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| self.dataset_name.clone())
    }
}

/// Summary of a pipeline batch
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub datasets: Vec<DatasetReport>,
    pub duration: Duration,

    /// Batch-level errors (alert delivery)
    pub errors: Vec<PipelineError>,

    /// Severity of the alert sent for this batch, if any
    pub alert: Option<AlertSeverity>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn add_report(&mut self, report: DatasetReport) {
        self.datasets.push(report);
    }

    pub fn add_error(&mut self, error: PipelineError) {
        self.errors.push(error);
    }

    pub fn total(&self) -> usize {
        self.datasets.len()
    }

    pub fn failed(&self) -> usize {
        self.datasets.iter().filter(|d| d.is_failed()).count()
    }

    pub fn degraded(&self) -> usize {
        self.datasets.iter().filter(|d| d.is_degraded()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.total() - self.failed()
    }

    /// No dataset failed or degraded
    pub fn is_successful(&self) -> bool {
        self.failed() == 0 && self.degraded() == 0
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.datasets.is_empty() {
            return 100.0;
        }
        (self.succeeded() as f64 / self.total() as f64) * 100.0
    }

    pub fn report(&self, name: &str) -> Option<&DatasetReport> {
        self.datasets.iter().find(|d| d.dataset_name == name)
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            degraded = self.degraded(),
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Batch completed"
        );

        for report in &self.datasets {
            for error in &report.errors {
                tracing::warn!(
                    dataset = %report.label(),
                    stage = ?error.stage,
                    message = %error.message,
                    "Dataset error"
                );
            }
        }

        for error in &self.errors {
            tracing::warn!(stage = ?error.stage, message = %error.message, "Batch error");
        }
    }
}
