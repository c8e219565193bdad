//! Publish pipeline - top-level orchestrator over a batch of datasets
//!
//! Each dataset runs independently and strictly in sequence: export (when
//! the mode exports), metadata parsing and catalog reconcile (when the mode
//! publishes). Failures are recorded in the [`BatchSummary`] and never stop
//! the batch. Production datasets that failed or degraded raise one alert at
//! the end of the batch.

use super::summary::{BatchSummary, CatalogStatus, DatasetReport, PipelineError, PipelineStage};
use crate::adapters::alert::{self, Alert, AlertSeverity, Alerter};
use crate::adapters::ckan::CkanClient;
use crate::adapters::source::OgrInfoSource;
use crate::adapters::writer::ProcessWriter;
use crate::config::GeoPublishConfig;
use crate::core::catalog::{CatalogReconciler, CatalogSettings, ReconcileOutcome};
use crate::core::export::{ExportCoordinator, ExporterRegistry};
use crate::core::metadata::{MetadataDefaults, MetadataParser};
use crate::domain::{
    DatasetSpec, Environment, ExportResult, FormatTag, GeoPublishError, MetadataRecord,
    MetadataValidationError, Result,
};
use crate::logging::LevelSwitch;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Publish pipeline
pub struct PublishPipeline {
    coordinator: ExportCoordinator,
    parser: MetadataParser,

    /// Absent when no catalog is configured; publishing datasets then fail
    reconciler: Option<CatalogReconciler>,

    alerter: Arc<dyn Alerter>,
    levels: LevelSwitch,
}

impl PublishPipeline {
    pub fn new(
        coordinator: ExportCoordinator,
        parser: MetadataParser,
        reconciler: Option<CatalogReconciler>,
        alerter: Arc<dyn Alerter>,
        levels: LevelSwitch,
    ) -> Self {
        Self {
            coordinator,
            parser,
            reconciler,
            alerter,
            levels,
        }
    }

    /// Builds the pipeline with the process, CKAN and alert adapters
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the catalog or alert clients cannot
    /// be built.
    pub fn from_config(config: &GeoPublishConfig, levels: LevelSwitch) -> Result<Self> {
        let timeout = Duration::from_secs(config.export.command_timeout_seconds);
        let source = Arc::new(OgrInfoSource::new(
            config.export.ogrinfo_path.clone(),
            timeout,
        ));
        let writer = Arc::new(ProcessWriter::from_config(&config.export));
        let coordinator = ExportCoordinator::new(
            source,
            ExporterRegistry::with_writer(writer),
            &config.paths,
            &config.export,
        );

        let parser = MetadataParser::new(MetadataDefaults::from_config(
            &config.export,
            config.catalog.as_ref(),
        ))?;

        let reconciler = match &config.catalog {
            Some(catalog) => Some(CatalogReconciler::new(
                Arc::new(CkanClient::new(catalog)?),
                CatalogSettings::from_config(catalog)?,
            )),
            None => None,
        };

        Ok(Self::new(
            coordinator,
            parser,
            reconciler,
            alert::from_config(&config.alerts)?,
            levels,
        ))
    }

    /// Runs every dataset and sends the batch alert
    pub async fn run(&self, specs: &[DatasetSpec]) -> BatchSummary {
        let start_time = Instant::now();
        let mut summary = BatchSummary::new();

        tracing::info!(datasets = specs.len(), "Starting publish pipeline");

        for spec in specs {
            self.levels.set_level(spec.log_level);
            let span = tracing::info_span!(
                "dataset",
                dataset = %spec.dataset_name,
                mode = %spec.execution_mode
            );
            let report = self.run_dataset(spec).instrument(span).await;
            summary.add_report(report);
        }
        self.levels.reset();

        let mut summary = summary.with_duration(start_time.elapsed());
        self.send_alert(&mut summary).await;
        summary
    }

    async fn run_dataset(&self, spec: &DatasetSpec) -> DatasetReport {
        let mut report = DatasetReport::new(spec);
        let mode = spec.execution_mode;

        let identifier = match self.coordinator.identifier(spec) {
            Ok(identifier) => identifier,
            Err(e) => {
                report.add_error(PipelineError::from(&e));
                return report;
            }
        };
        report.identifier = Some(identifier.clone());

        let export = if mode.exports() {
            match self.coordinator.run(spec).await {
                Ok(result) => result,
                Err(GeoPublishError::DatasetExport(failure)) => {
                    report.add_error(
                        PipelineError::new(PipelineStage::Export, failure.to_string())
                            .with_context(identifier.to_string()),
                    );
                    report.export = Some(failure.result);
                    return report;
                }
                Err(e) => {
                    report.add_error(PipelineError::from(&e).with_context(identifier.to_string()));
                    return report;
                }
            }
        } else {
            match self.coordinator.collect_existing(spec).await {
                Ok(result) => result,
                Err(e) => {
                    report.add_error(PipelineError::from(&e).with_context(identifier.to_string()));
                    return report;
                }
            }
        };
        report.export = Some(export.clone());

        if !mode.publishes() {
            return report;
        }

        if !export.has_artifacts() {
            report.add_error(
                PipelineError::new(PipelineStage::Export, "no exported artifacts to publish")
                    .with_context(identifier.to_string()),
            );
            return report;
        }

        let Some(reconciler) = &self.reconciler else {
            report.add_error(PipelineError::new(
                PipelineStage::Configuration,
                "no [catalog] section configured",
            ));
            return report;
        };

        let record = match self.load_metadata(spec, &export).await {
            Ok(record) => record.without_fields(&spec.exclude_fields),
            Err(e) => {
                tracing::error!(error = %e, "Metadata rejected, skipping catalog update");
                report.add_error(
                    PipelineError::new(PipelineStage::Metadata, e.to_string())
                        .with_context(identifier.to_string()),
                );
                return report;
            }
        };

        let outcome = reconciler.reconcile(&identifier, &record, &export).await;
        report.catalog = CatalogStatus::from(&outcome);
        if let ReconcileOutcome::Failed(e) = &outcome {
            report.add_error(PipelineError::from(e).with_context(identifier.to_string()));
        }

        report
    }

    /// Parses the metadata artifact, or falls back to configured defaults
    async fn load_metadata(
        &self,
        spec: &DatasetSpec,
        export: &ExportResult,
    ) -> std::result::Result<MetadataRecord, MetadataValidationError> {
        let artifact = export
            .artifacts()
            .find(|(format, _)| *format == FormatTag::Metadata)
            .map(|(_, path)| path);

        match artifact {
            Some(path) => self.parser.parse(path, &spec.dataset_name).await,
            None => {
                tracing::info!("No metadata artifact, using configured defaults");
                self.parser.from_defaults(&spec.dataset_name)
            }
        }
    }

    /// Sends one alert for the production datasets of the batch
    ///
    /// ERROR when any production dataset failed, WARNING when they only
    /// degraded. Test datasets never alert.
    async fn send_alert(&self, summary: &mut BatchSummary) {
        let Some(alert) = build_alert(summary) else {
            return;
        };

        match self.alerter.send(&alert).await {
            Ok(()) => summary.alert = Some(alert.severity),
            Err(e) => {
                tracing::error!(error = %e, "Failed to send alert");
                summary.add_error(PipelineError::new(PipelineStage::Alert, e.to_string()));
            }
        }
    }
}

/// Alert for the production datasets of `summary`, if any needs one
pub fn build_alert(summary: &BatchSummary) -> Option<Alert> {
    let production = || {
        summary
            .datasets
            .iter()
            .filter(|d| d.environment == Environment::Prod)
    };
    let failed: Vec<&DatasetReport> = production().filter(|d| d.is_failed()).collect();
    let degraded: Vec<&DatasetReport> = production().filter(|d| d.is_degraded()).collect();

    let severity = if !failed.is_empty() {
        AlertSeverity::Error
    } else if !degraded.is_empty() {
        AlertSeverity::Warning
    } else {
        return None;
    };

    let mut body = String::new();
    for report in &failed {
        let _ = writeln!(body, "{} failed:", report.label());
        for error in &report.errors {
            let _ = writeln!(body, "  - {error}");
        }
    }
    for report in &degraded {
        let _ = writeln!(body, "{} published with failed formats:", report.label());
        if let Some(export) = &report.export {
            for (format, outcome) in export.iter() {
                if let Some(error) = &outcome.error {
                    let _ = writeln!(body, "  - {format}: {error}");
                }
            }
        }
    }

    let subject = match severity {
        AlertSeverity::Error => format!("{} production dataset(s) failed", failed.len()),
        AlertSeverity::Warning => {
            format!("{} production dataset(s) degraded", degraded.len())
        }
    };

    Some(Alert {
        severity,
        subject,
        body,
        datasets: failed
            .iter()
            .chain(degraded.iter())
            .map(|d| d.label())
            .collect(),
    })
}
