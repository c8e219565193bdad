//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "geopublish.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing geopublish configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your paths and datasets", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set GEOPUBLISH_CKAN_API_KEY");
                println!("  3. Validate configuration: geopublish validate-config");
                println!("  4. Run: geopublish run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    /// Sample configuration with every section
    fn generate_config() -> String {
        r#"# geopublish Configuration File
# Exports feature classes to open data formats and publishes them to CKAN

[application]
log_level = "info"

[paths]
# Published download tree: <output_root>/<identifier>/<format>/<identifier>.<ext>
output_root = "/srv/opendata"

# Scratch space, one subdirectory per dataset run
temp_root = "/tmp/geopublish"

[export]
# Prefix stripped from dataset names when deriving identifiers
dataset_prefix = "Gilpin County"

# Reference system of KML and GeoJSON output
map_srs = "EPSG:4326"
# Coordinate operation passed to ogr2ogr -ct: a PROJ pipeline or an
# operation URN such as "urn:ogc:def:coordinateOperation:EPSG::1515"
# transformation = "+proj=pipeline +step ..."

ogr2ogr_path = "ogr2ogr"
ogrinfo_path = "ogrinfo"
command_timeout_seconds = 3600

# Per-format command templates; placeholders {output} {source} {layer} {fields}
# {exclude_fields} {target_srs} {transformation} {gdb_version} {name}
[export.commands]
# dwg = "ogr2ogr -f DXF {output} {source} {layer}"

[catalog]
base_url = "https://data.example.org"
api_key = "${GEOPUBLISH_CKAN_API_KEY}"
download_base_url = "https://downloads.example.org/opendata"
# title_template = "{prefix}: {name}"
license_id = "cc-by"
group = "gilpin-county"
# owner_org = "gilpin-county"
maintainer = "GIS Department"
maintainer_email = "gis@example.org"
author = "GIS Department"
timeout_seconds = 60
tls_verify = true

[catalog.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

[alerts]
# Production datasets that fail or degrade raise one alert per run
enabled = false
# webhook_url = "https://hooks.example.org/geopublish"
recipients = ["gis@example.org"]
subject_prefix = "[geopublish]"

[logging]
local_enabled = true
local_path = "logs"
local_rotation = "daily"

# One entry per dataset, run in order
[[datasets]]
source_workspace = "/data/county.gdb"
feature_class = "BuildingFootprint"
dataset_name = "BuildingFootprints"
# Empty or omitted means all formats: shp, dwg, kml, json, csv, metadata, gdb
export_formats = ["shp", "kml", "csv", "metadata"]
# Copied as the metadata artifact; dwg and metadata without a document need
# an [export.commands] entry
metadata_path = "/data/metadata/BuildingFootprint.xml"
exclude_fields = ["TEMP1"]
gdb_version = "CURRENT"
execution_mode = "ALL"    # EXPORT | PUBLISH | ALL
environment = "TEST"      # TEST | PROD
log_level = "INFO"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeoPublishConfig;
    use tempfile::TempDir;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "geopublish.toml".to_string(),
            force: false,
        };

        assert_eq!(args.output, "geopublish.toml");
        assert!(!args.force);
    }

    #[test]
    fn test_generated_config_deserializes() {
        let config: GeoPublishConfig = toml::from_str(&InitArgs::generate_config()).unwrap();
        assert_eq!(config.datasets.len(), 1);
        assert_eq!(config.datasets[0].dataset_name, "BuildingFootprints");
        assert!(config.catalog.is_some());
        assert!(config.format_warnings().is_empty());
    }

    #[tokio::test]
    async fn test_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("geopublish.toml");
        fs::write(&output, "existing").unwrap();

        let args = InitArgs {
            output: output.to_string_lossy().into_owned(),
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(fs::read_to_string(&output).unwrap(), "existing");

        let args = InitArgs { force: true, ..args };
        assert_eq!(args.execute().await.unwrap(), 0);
        assert!(fs::read_to_string(&output)
            .unwrap()
            .contains("[[datasets]]"));
    }
}
