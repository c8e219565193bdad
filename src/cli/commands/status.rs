//! Status command implementation
//!
//! This module implements the `status` command, which lists the artifacts
//! currently on disk for each configured dataset.

use crate::config::load_config;
use crate::core::export::collect_artifacts;
use crate::domain::ExportStatus;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Filter by dataset name
    #[arg(long)]
    pub dataset: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        println!("📊 Export Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {}", e);
                return Ok(2);
            }
        };

        let datasets: Vec<_> = config
            .datasets
            .iter()
            .filter(|d| {
                self.dataset
                    .as_deref()
                    .map_or(true, |name| d.dataset_name.eq_ignore_ascii_case(name))
            })
            .collect();

        if datasets.is_empty() {
            println!("No datasets match the specified filters.");
            return Ok(0);
        }

        println!(
            "{:<30} {:<30} {:<10} {:<10}",
            "Dataset", "Identifier", "Format", "Status"
        );
        println!("{}", "-".repeat(90));

        for dataset in datasets {
            let identifier = match config.identifier_for(dataset) {
                Ok(id) => id,
                Err(e) => {
                    println!("{:<30} ❌ {}", dataset.dataset_name, e);
                    continue;
                }
            };

            let dataset_dir = config.paths.output_root.join(identifier.as_str());
            let artifacts =
                collect_artifacts(&dataset_dir, identifier.clone(), &dataset.formats()).await;

            for (format, outcome) in artifacts.iter() {
                let status = match outcome.status {
                    ExportStatus::Success => "✅ Present",
                    _ => "⏸️  Missing",
                };
                println!(
                    "{:<30} {:<30} {:<10} {:<10}",
                    dataset.dataset_name,
                    identifier.as_str(),
                    format.as_str(),
                    status
                );
            }
        }

        println!();
        Ok(0)
    }
}
