//! Run command implementation
//!
//! This module implements the `run` command, which exports the configured
//! datasets and publishes them to the catalog.

use crate::config::{load_config, parse_format_list, GeoPublishConfig};
use crate::core::pipeline::{BatchSummary, PublishPipeline};
use crate::domain::{ExecutionMode, ExportStatus};
use crate::logging::LevelSwitch;
use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Run only the named dataset (repeatable)
    #[arg(long, value_name = "NAME")]
    pub dataset: Vec<String>,

    /// Override execution mode (EXPORT, PUBLISH or ALL)
    #[arg(long)]
    pub mode: Option<String>,

    /// Override export formats (comma-separated, e.g. shp,kml)
    #[arg(long)]
    pub formats: Option<String>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str, levels: LevelSwitch) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = self.apply_overrides(&mut config) {
            tracing::error!(error = %e, "Invalid command line override");
            eprintln!("{e}");
            return Ok(2);
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        for warning in config.format_warnings() {
            tracing::warn!(warning = %warning, "Format cannot be produced");
            eprintln!("⚠️  {warning}");
        }

        if config.datasets.is_empty() {
            println!("No datasets configured. Add a [[datasets]] entry to {config_path}.");
            return Ok(0);
        }

        if !self.yes {
            println!("Run Configuration:");
            println!("  Output root: {}", config.paths.output_root.display());
            if let Some(catalog) = &config.catalog {
                println!("  Catalog: {}", catalog.base_url);
            }
            println!("  Datasets:");
            for dataset in &config.datasets {
                println!(
                    "    - {} [{} / {}] {:?}",
                    dataset.dataset_name,
                    dataset.execution_mode,
                    dataset.environment,
                    dataset
                        .formats()
                        .iter()
                        .map(|f| f.as_str())
                        .collect::<Vec<_>>()
                );
            }
            println!();
            print!("Proceed with run? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Run cancelled.");
                return Ok(0);
            }
        }

        let pipeline = match PublishPipeline::from_config(&config, levels) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create publish pipeline");
                eprintln!("Failed to initialize pipeline: {e}");
                return Ok(2);
            }
        };

        println!("🚀 Starting run...");
        println!();

        let summary = pipeline.run(&config.datasets).await;
        summary.log_summary();
        print_summary(&summary);

        let exit_code = if summary.is_successful() && summary.errors.is_empty() {
            println!("✅ Run completed successfully!");
            0
        } else {
            println!("⚠️  Run completed with failures");
            1
        };

        Ok(exit_code)
    }

    /// Narrows and overrides the configured datasets
    fn apply_overrides(&self, config: &mut GeoPublishConfig) -> Result<(), String> {
        if !self.dataset.is_empty() {
            for name in &self.dataset {
                if !config
                    .datasets
                    .iter()
                    .any(|d| d.dataset_name.eq_ignore_ascii_case(name))
                {
                    return Err(format!("Unknown dataset: {name}"));
                }
            }
            config.datasets.retain(|d| {
                self.dataset
                    .iter()
                    .any(|name| d.dataset_name.eq_ignore_ascii_case(name))
            });
            tracing::info!(datasets = ?self.dataset, "Selecting datasets from CLI");
        }

        if let Some(mode) = &self.mode {
            let mode: ExecutionMode = mode.parse()?;
            tracing::info!(mode = %mode, "Overriding execution mode from CLI");
            for dataset in &mut config.datasets {
                dataset.execution_mode = mode;
            }
        }

        if let Some(formats) = &self.formats {
            let formats = parse_format_list(formats)?;
            tracing::info!(formats = ?formats, "Overriding export formats from CLI");
            for dataset in &mut config.datasets {
                dataset.export_formats = formats.clone();
            }
        }

        Ok(())
    }
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("📊 Run Summary:");
    println!("  Datasets: {}", summary.total());
    println!("  Succeeded: {}", summary.succeeded());
    println!("  Degraded: {}", summary.degraded());
    println!("  Failed: {}", summary.failed());
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", summary.success_rate());
    if let Some(severity) = summary.alert {
        println!("  Alert sent: {severity}");
    }
    println!();

    for report in &summary.datasets {
        let status = if report.is_failed() {
            "❌"
        } else if report.is_degraded() {
            "⚠️ "
        } else {
            "✅"
        };
        println!("{status} {} ({})", report.label(), report.mode);

        if let Some(export) = &report.export {
            for (format, outcome) in export.iter() {
                let detail = match (&outcome.status, &outcome.error, &outcome.note) {
                    (ExportStatus::Success, _, _) => outcome.artifact_path.display().to_string(),
                    (_, Some(error), _) => error.to_string(),
                    (_, None, Some(note)) => note.clone(),
                    (_, None, None) => String::new(),
                };
                println!("    {format:<9} {:<8} {detail}", outcome.status);
            }
        }
        println!("    catalog   {}", report.catalog);

        for error in &report.errors {
            println!("    - {error}");
        }
    }

    if !summary.errors.is_empty() {
        println!();
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("  - {error}");
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::domain::FormatTag;

    const CONFIG: &str = r#"
[paths]
output_root = "/srv/opendata"
temp_root = "/tmp/geopublish"

[[datasets]]
feature_class = "BuildingFootprint"
dataset_name = "BuildingFootprints"

[[datasets]]
feature_class = "Parcel"
dataset_name = "Parcels"
export_formats = ["csv"]
"#;

    fn args() -> RunArgs {
        RunArgs {
            yes: true,
            dataset: Vec::new(),
            mode: None,
            formats: None,
        }
    }

    #[test]
    fn test_run_args_defaults() {
        let args = args();
        assert!(args.dataset.is_empty());
        assert!(args.mode.is_none());
        assert!(args.formats.is_none());
    }

    #[test]
    fn test_overrides_select_datasets() {
        let mut config = parse_config(CONFIG).unwrap();
        let args = RunArgs {
            dataset: vec!["parcels".to_string()],
            ..args()
        };

        args.apply_overrides(&mut config).unwrap();
        assert_eq!(config.datasets.len(), 1);
        assert_eq!(config.datasets[0].dataset_name, "Parcels");
    }

    #[test]
    fn test_overrides_unknown_dataset() {
        let mut config = parse_config(CONFIG).unwrap();
        let args = RunArgs {
            dataset: vec!["Roads".to_string()],
            ..args()
        };

        let err = args.apply_overrides(&mut config).unwrap_err();
        assert!(err.contains("Roads"));
    }

    #[test]
    fn test_overrides_mode_and_formats() {
        let mut config = parse_config(CONFIG).unwrap();
        let args = RunArgs {
            mode: Some("export".to_string()),
            formats: Some("shp, kml".to_string()),
            ..args()
        };

        args.apply_overrides(&mut config).unwrap();
        for dataset in &config.datasets {
            assert_eq!(dataset.execution_mode, ExecutionMode::Export);
            assert!(dataset.export_formats.contains(&FormatTag::Shapefile));
            assert!(dataset.export_formats.contains(&FormatTag::Kml));
            assert_eq!(dataset.export_formats.len(), 2);
        }
    }

    #[test]
    fn test_overrides_invalid_mode() {
        let mut config = parse_config(CONFIG).unwrap();
        let args = RunArgs {
            mode: Some("sometimes".to_string()),
            ..args()
        };

        assert!(args.apply_overrides(&mut config).is_err());
    }
}
