//! Configuration schema types
//!
//! This module defines the configuration structure for geopublish.

use crate::config::SecretString;
use crate::domain::{DatasetIdentifier, DatasetSpec, FormatTag, GdbVersion};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Main geopublish configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPublishConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Output and temp roots
    pub paths: PathsConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Catalog settings (required when any dataset publishes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogConfig>,

    /// Alert settings
    #[serde(default)]
    pub alerts: AlertConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dataset jobs, run in order
    #[serde(default)]
    pub datasets: Vec<DatasetSpec>,
}

impl GeoPublishConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.paths.validate()?;
        self.export.validate()?;

        let publishes = self.datasets.iter().any(|d| d.execution_mode.publishes());
        match &self.catalog {
            Some(catalog) => catalog.validate()?,
            None if publishes => {
                return Err(
                    "catalog configuration is required when a dataset uses execution_mode PUBLISH or ALL"
                        .to_string(),
                );
            }
            None => {}
        }

        self.alerts.validate()?;
        self.logging.validate()?;
        self.validate_datasets()?;
        Ok(())
    }

    fn validate_datasets(&self) -> Result<(), String> {
        let mut seen: BTreeMap<DatasetIdentifier, &str> = BTreeMap::new();

        for dataset in &self.datasets {
            dataset.validate()?;

            let identifier = self.identifier_for(dataset)?;
            if let Some(previous) = seen.insert(identifier.clone(), &dataset.dataset_name) {
                return Err(format!(
                    "datasets '{}' and '{}' both map to identifier '{}'",
                    previous, dataset.dataset_name, identifier
                ));
            }
        }

        Ok(())
    }

    /// Requested formats the configured writers cannot produce
    ///
    /// These pass validation but always fail at export time, leaving the
    /// dataset degraded on every run.
    pub fn format_warnings(&self) -> Vec<String> {
        let commands = &self.export.commands;
        let mut warnings = Vec::new();

        for dataset in self.datasets.iter().filter(|d| d.execution_mode.exports()) {
            for format in dataset.formats() {
                if commands.contains_key(&format) {
                    continue;
                }
                let reason = match format {
                    FormatTag::Cad => "needs an [export.commands] dwg entry",
                    FormatTag::Metadata if dataset.metadata_path.is_none() => {
                        "needs a metadata_path or an [export.commands] metadata entry"
                    }
                    FormatTag::FileGeodatabase
                        if matches!(dataset.gdb_version, GdbVersion::V9_2 | GdbVersion::V9_3) =>
                    {
                        "needs an [export.commands] gdb entry for geodatabase version 9.x"
                    }
                    _ => continue,
                };
                warnings.push(format!(
                    "datasets[{}]: format {} {}; the dataset will report as degraded",
                    dataset.dataset_name, format, reason
                ));
            }
        }

        warnings
    }

    /// Derives the dataset identifier with the configured prefix
    pub fn identifier_for(&self, dataset: &DatasetSpec) -> Result<DatasetIdentifier, String> {
        DatasetIdentifier::derive(&dataset.dataset_name, self.export.dataset_prefix.as_deref())
            .map_err(|e| format!("datasets[{}]: {}", dataset.dataset_name, e))
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Filesystem roots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the published download tree
    pub output_root: PathBuf,

    /// Root of the per-dataset scratch workspaces
    #[serde(default = "default_temp_root")]
    pub temp_root: PathBuf,
}

impl PathsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.output_root.as_os_str().is_empty() {
            return Err("paths.output_root cannot be empty".to_string());
        }

        if self.temp_root.as_os_str().is_empty() {
            return Err("paths.temp_root cannot be empty".to_string());
        }

        if self.temp_root == self.output_root {
            return Err("paths.temp_root must differ from paths.output_root".to_string());
        }

        Ok(())
    }
}

/// Export settings shared by all datasets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Prefix stripped from dataset names when deriving identifiers
    #[serde(default)]
    pub dataset_prefix: Option<String>,

    /// Fixed reference system of map display formats (KML, GeoJSON)
    #[serde(default = "default_map_srs")]
    pub map_srs: String,

    /// Coordinate operation applied when reprojecting to `map_srs`
    ///
    /// Passed to `ogr2ogr -ct`, so it must be a PROJ pipeline string such as
    /// `+proj=pipeline +step ...` or a coordinate operation URN like
    /// `urn:ogc:def:coordinateOperation:EPSG::1515`. Transformation names
    /// like `NAD_1983_To_WGS_1984_5` are not understood by GDAL.
    #[serde(default)]
    pub transformation: Option<String>,

    /// Path of the `ogr2ogr` executable
    #[serde(default = "default_ogr2ogr_path")]
    pub ogr2ogr_path: String,

    /// Path of the `ogrinfo` executable
    #[serde(default = "default_ogrinfo_path")]
    pub ogrinfo_path: String,

    /// Maximum run time of one writer command in seconds
    #[serde(default = "default_command_timeout_seconds")]
    pub command_timeout_seconds: u64,

    /// Per-format command templates overriding the built-in writers
    #[serde(default)]
    pub commands: BTreeMap<FormatTag, String>,
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.map_srs.trim().is_empty() {
            return Err("export.map_srs cannot be empty".to_string());
        }

        if self.ogr2ogr_path.trim().is_empty() {
            return Err("export.ogr2ogr_path cannot be empty".to_string());
        }

        if self.ogrinfo_path.trim().is_empty() {
            return Err("export.ogrinfo_path cannot be empty".to_string());
        }

        if self.command_timeout_seconds == 0 {
            return Err("export.command_timeout_seconds must be > 0".to_string());
        }

        for (format, template) in &self.commands {
            if !template.contains("{output}") {
                return Err(format!(
                    "export.commands.{format} must contain the {{output}} placeholder"
                ));
            }
        }

        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dataset_prefix: None,
            map_srs: default_map_srs(),
            transformation: None,
            ogr2ogr_path: default_ogr2ogr_path(),
            ogrinfo_path: default_ogrinfo_path(),
            command_timeout_seconds: default_command_timeout_seconds(),
            commands: BTreeMap::new(),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Catalog (CKAN) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog site URL, e.g. `https://data.example.org`
    pub base_url: String,

    /// API key sent in the Authorization header
    /// Stored securely in memory and automatically zeroized on drop
    pub api_key: SecretString,

    /// Public URL of the output root
    pub download_base_url: String,

    /// Title used when the metadata document has none; `{name}` and
    /// `{prefix}` are substituted
    #[serde(default)]
    pub title_template: Option<String>,

    #[serde(default)]
    pub license_id: Option<String>,

    /// Group name the dataset is added to
    #[serde(default)]
    pub group: Option<String>,

    /// Owning organization id or name
    #[serde(default)]
    pub owner_org: Option<String>,

    #[serde(default)]
    pub maintainer: Option<String>,

    #[serde(default)]
    pub maintainer_email: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TLS certificate verification enabled
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl CatalogConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.base_url.is_empty() {
            return Err("catalog.base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("catalog.base_url must start with http:// or https://".to_string());
        }

        if self.api_key.expose_secret().is_empty() {
            return Err("catalog.api_key cannot be empty".to_string());
        }

        if let Err(e) = url::Url::parse(&self.download_base_url) {
            return Err(format!(
                "catalog.download_base_url '{}' is not a valid URL: {}",
                self.download_base_url, e
            ));
        }

        if let Some(email) = &self.maintainer_email {
            if !email.contains('@') {
                return Err(format!(
                    "catalog.maintainer_email '{email}' is not an email address"
                ));
            }
        }

        if self.timeout_seconds == 0 {
            return Err("catalog.timeout_seconds must be > 0".to_string());
        }

        if self.retry.max_retries == 0 || self.retry.max_retries > 10 {
            return Err(format!(
                "catalog.retry.max_retries must be between 1 and 10, got {}",
                self.retry.max_retries
            ));
        }

        Ok(())
    }
}

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Send alerts for production datasets
    #[serde(default)]
    pub enabled: bool,

    /// Endpoint receiving alert JSON
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Addresses forwarded with the alert
    #[serde(default)]
    pub recipients: Vec<String>,

    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl AlertConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }

        match self.webhook_url.as_deref() {
            None | Some("") => {
                Err("alerts.webhook_url is required when alerts are enabled".to_string())
            }
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                Err("alerts.webhook_url must start with http:// or https://".to_string())
            }
            Some(_) => Ok(()),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            recipients: Vec::new(),
            subject_prefix: default_subject_prefix(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled".to_string());
        }

        Ok(())
    }

    /// Console-only logging
    pub fn console_only() -> Self {
        Self {
            local_enabled: false,
            ..Self::default()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

/// Formats a dataset run may be narrowed to from the command line
pub fn parse_format_list(list: &str) -> Result<BTreeSet<FormatTag>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_temp_root() -> PathBuf {
    std::env::temp_dir().join("geopublish")
}

fn default_map_srs() -> String {
    "EPSG:4326".to_string()
}

fn default_ogr2ogr_path() -> String {
    "ogr2ogr".to_string()
}

fn default_ogrinfo_path() -> String {
    "ogrinfo".to_string()
}

fn default_command_timeout_seconds() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_subject_prefix() -> String {
    "[geopublish]".to_string()
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
