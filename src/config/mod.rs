//! Configuration management for geopublish.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! geopublish uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `GEOPUBLISH_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Per-section validation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use geopublish::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("geopublish.toml")?;
//!
//! println!("Output root: {}", config.paths.output_root.display());
//! if let Some(catalog) = &config.catalog {
//!     println!("Catalog: {}", catalog.base_url);
//! }
//! println!("Datasets: {}", config.datasets.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`PathsConfig`] - Output and temp roots
//! - [`ExportConfig`] - Identifier prefix, map reference system, writer commands
//! - [`CatalogConfig`] - CKAN connection, defaults and retry policy
//! - [`AlertConfig`] - Alert webhook
//! - [`LoggingConfig`] - Log file settings
//! - [`DatasetSpec`](crate::domain::DatasetSpec) - One `[[datasets]]` entry
//!
//! # Example Configuration
//!
//! ```toml
//! [paths]
//! output_root = "/srv/opendata"
//!
//! [export]
//! dataset_prefix = "Gilpin County"
//! map_srs = "EPSG:4326"
//!
//! [export.commands]
//! dwg = "ogr2ogr -f DXF {output} {source} {layer}"
//!
//! [catalog]
//! base_url = "https://data.example.org"
//! api_key = "${CKAN_API_KEY}"
//! download_base_url = "https://downloads.example.org/opendata"
//! group = "gilpin-county"
//!
//! [[datasets]]
//! source_workspace = "/data/county.gdb"
//! feature_class = "BuildingFootprint"
//! dataset_name = "BuildingFootprints"
//! export_formats = ["shp", "kml"]
//! exclude_fields = ["TEMP1"]
//! execution_mode = "ALL"
//! environment = "PROD"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    parse_format_list, AlertConfig, ApplicationConfig, CatalogConfig, ExportConfig,
    GeoPublishConfig, LoggingConfig, PathsConfig, RetryConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
