//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the geopublish configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading runs substitution, overrides and validation
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Output Root: {}", config.paths.output_root.display());
        println!("  Temp Root: {}", config.paths.temp_root.display());
        println!(
            "  Dataset Prefix: {}",
            config.export.dataset_prefix.as_deref().unwrap_or("(none)")
        );
        println!("  Map SRS: {}", config.export.map_srs);

        match &config.catalog {
            Some(catalog) => {
                println!("  Catalog: {}", catalog.base_url);
                println!("  Download Base URL: {}", catalog.download_base_url);
                println!(
                    "  Catalog Group: {}",
                    catalog.group.as_deref().unwrap_or("(none)")
                );
            }
            None => println!("  Catalog: (not configured, export only)"),
        }

        println!(
            "  Alerts: {}",
            if config.alerts.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("  Datasets: {}", config.datasets.len());

        for dataset in &config.datasets {
            let identifier = config
                .identifier_for(dataset)
                .map(|id| id.to_string())
                .unwrap_or_else(|e| e);
            println!(
                "    - {} -> {} [{} / {}]",
                dataset.dataset_name, identifier, dataset.execution_mode, dataset.environment
            );
        }
        println!();

        let warnings = config.format_warnings();
        if !warnings.is_empty() {
            println!("⚠️  Warnings:");
            for warning in &warnings {
                tracing::warn!(warning = %warning, "Format cannot be produced");
                println!("   - {warning}");
            }
            println!();
        }

        Ok(0)
    }
}
