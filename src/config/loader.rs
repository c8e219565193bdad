//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::GeoPublishConfig;
use super::secret::secret_string;
use crate::domain::errors::GeoPublishError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into GeoPublishConfig
/// 4. Applies environment variable overrides (GEOPUBLISH_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use geopublish::config::loader::load_config;
///
/// let config = load_config("geopublish.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<GeoPublishConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(GeoPublishError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        GeoPublishError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration text
///
/// Performs the same substitution, override and validation steps as
/// [`load_config`].
pub fn parse_config(contents: &str) -> Result<GeoPublishConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: GeoPublishConfig = toml::from_str(&contents)
        .map_err(|e| GeoPublishError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        GeoPublishError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| GeoPublishError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(GeoPublishError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the GEOPUBLISH_* prefix
///
/// Environment variables follow the pattern: GEOPUBLISH_<SECTION>_<KEY>
/// For example: GEOPUBLISH_CATALOG_API_KEY, GEOPUBLISH_PATHS_OUTPUT_ROOT
fn apply_env_overrides(config: &mut GeoPublishConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("GEOPUBLISH_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Path overrides
    if let Ok(val) = std::env::var("GEOPUBLISH_PATHS_OUTPUT_ROOT") {
        config.paths.output_root = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("GEOPUBLISH_PATHS_TEMP_ROOT") {
        config.paths.temp_root = PathBuf::from(val);
    }

    // Export overrides
    if let Ok(val) = std::env::var("GEOPUBLISH_EXPORT_DATASET_PREFIX") {
        config.export.dataset_prefix = Some(val);
    }
    if let Ok(val) = std::env::var("GEOPUBLISH_EXPORT_MAP_SRS") {
        config.export.map_srs = val;
    }
    if let Ok(val) = std::env::var("GEOPUBLISH_EXPORT_TRANSFORMATION") {
        config.export.transformation = Some(val);
    }
    if let Ok(val) = std::env::var("GEOPUBLISH_EXPORT_OGR2OGR_PATH") {
        config.export.ogr2ogr_path = val;
    }
    if let Ok(val) = std::env::var("GEOPUBLISH_EXPORT_OGRINFO_PATH") {
        config.export.ogrinfo_path = val;
    }
    if let Ok(val) = std::env::var("GEOPUBLISH_EXPORT_COMMAND_TIMEOUT_SECONDS") {
        if let Ok(seconds) = val.parse() {
            config.export.command_timeout_seconds = seconds;
        }
    }

    // Catalog overrides (only if a catalog is configured)
    if let Some(ref mut catalog) = config.catalog {
        if let Ok(val) = std::env::var("GEOPUBLISH_CATALOG_BASE_URL") {
            catalog.base_url = val;
        }
        if let Ok(val) = std::env::var("GEOPUBLISH_CATALOG_API_KEY") {
            catalog.api_key = secret_string(val);
        }
        if let Ok(val) = std::env::var("GEOPUBLISH_CATALOG_DOWNLOAD_BASE_URL") {
            catalog.download_base_url = val;
        }
        if let Ok(val) = std::env::var("GEOPUBLISH_CATALOG_LICENSE_ID") {
            catalog.license_id = Some(val);
        }
        if let Ok(val) = std::env::var("GEOPUBLISH_CATALOG_GROUP") {
            catalog.group = Some(val);
        }
        if let Ok(val) = std::env::var("GEOPUBLISH_CATALOG_OWNER_ORG") {
            catalog.owner_org = Some(val);
        }
        if let Ok(val) = std::env::var("GEOPUBLISH_CATALOG_TLS_VERIFY") {
            catalog.tls_verify = val.parse().unwrap_or(true);
        }
        if let Ok(val) = std::env::var("GEOPUBLISH_CATALOG_TIMEOUT_SECONDS") {
            if let Ok(seconds) = val.parse() {
                catalog.timeout_seconds = seconds;
            }
        }
    }

    // Alert overrides
    if let Ok(val) = std::env::var("GEOPUBLISH_ALERTS_ENABLED") {
        config.alerts.enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("GEOPUBLISH_ALERTS_WEBHOOK_URL") {
        config.alerts.webhook_url = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("GEOPUBLISH_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("GEOPUBLISH_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("GEOPUBLISH_TEST_SUBST_KEY", "test_value");
        let input = "api_key = \"${GEOPUBLISH_TEST_SUBST_KEY}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "api_key = \"test_value\"\n");
        std::env::remove_var("GEOPUBLISH_TEST_SUBST_KEY");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("GEOPUBLISH_TEST_MISSING_VAR");
        let input = "api_key = \"${GEOPUBLISH_TEST_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("GEOPUBLISH_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("GEOPUBLISH_TEST_COMMENTED");
        let input = "# api_key = \"${GEOPUBLISH_TEST_COMMENTED}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-geopublish.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[paths]
output_root = "/srv/opendata"
temp_root = "/tmp/geopublish-test"

[export]
dataset_prefix = "Gilpin County"

[[datasets]]
source_workspace = "/data/county.gdb"
feature_class = "Parcels"
dataset_name = "Gilpin County - Parcels"
execution_mode = "EXPORT"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.datasets.len(), 1);
        assert!(config.catalog.is_none());
        assert_eq!(
            config.identifier_for(&config.datasets[0]).unwrap().as_str(),
            "parcels"
        );
    }
}
