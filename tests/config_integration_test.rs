//! Integration tests for configuration loading and validation
//!
//! Tests that modify environment variables hold ENV_MUTEX.

use geopublish::config::load_config;
use geopublish::domain::{Environment, ExecutionMode, FormatTag, GdbVersion};
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    std::env::remove_var("GEOPUBLISH_APPLICATION_LOG_LEVEL");
    std::env::remove_var("GEOPUBLISH_PATHS_OUTPUT_ROOT");
    std::env::remove_var("GEOPUBLISH_EXPORT_DATASET_PREFIX");
    std::env::remove_var("GEOPUBLISH_CATALOG_API_KEY");
    std::env::remove_var("GEOPUBLISH_CATALOG_GROUP");
    std::env::remove_var("TEST_CKAN_API_KEY");
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

const COMPLETE_CONFIG: &str = r#"
[application]
log_level = "debug"

[paths]
output_root = "/srv/opendata"
temp_root = "/tmp/geopublish-test"

[export]
dataset_prefix = "Gilpin County"
map_srs = "EPSG:4326"
command_timeout_seconds = 600

[export.commands]
dwg = "ogr2ogr -f DXF {output} {source} {layer}"

[catalog]
base_url = "https://data.example.org"
api_key = "test-key-12345"
download_base_url = "https://downloads.example.org/opendata"
license_id = "cc-by"
group = "gilpin-county"
maintainer_email = "gis@example.org"

[catalog.retry]
max_retries = 5

[alerts]
enabled = true
webhook_url = "https://hooks.example.org/geopublish"

[logging]
local_enabled = false
local_rotation = "hourly"

[[datasets]]
source_workspace = "/data/county.gdb"
feature_class = "BuildingFootprint"
dataset_name = "Gilpin County BuildingFootprints"
export_formats = ["shp", "kml"]
exclude_fields = ["TEMP1"]
gdb_version = "10.0"
execution_mode = "ALL"
environment = "PROD"

[[datasets]]
feature_class = "/data/roads.shp"
dataset_name = "Road-Centerlines"
exe_result = "EXPORT"
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let temp_file = write_config(COMPLETE_CONFIG);
    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.paths.output_root.to_str(), Some("/srv/opendata"));
    assert_eq!(config.export.dataset_prefix.as_deref(), Some("Gilpin County"));
    assert_eq!(config.export.command_timeout_seconds, 600);
    assert!(config.export.commands.contains_key(&FormatTag::Cad));

    let catalog = config.catalog.as_ref().unwrap();
    assert_eq!(catalog.base_url, "https://data.example.org");
    assert_eq!(catalog.api_key.expose_secret().as_str(), "test-key-12345");
    assert_eq!(catalog.group.as_deref(), Some("gilpin-county"));
    assert_eq!(catalog.retry.max_retries, 5);

    assert!(config.alerts.enabled);
    assert!(!config.logging.local_enabled);

    assert_eq!(config.datasets.len(), 2);
    let footprints = &config.datasets[0];
    assert_eq!(footprints.environment, Environment::Prod);
    assert_eq!(footprints.gdb_version, GdbVersion::V10_0);
    assert_eq!(
        footprints.formats().into_iter().collect::<Vec<_>>(),
        vec![FormatTag::Shapefile, FormatTag::Kml]
    );
    assert_eq!(
        config.identifier_for(footprints).unwrap().as_str(),
        "buildingfootprints"
    );

    let roads = &config.datasets[1];
    assert_eq!(roads.execution_mode, ExecutionMode::Export);
    assert_eq!(roads.formats().len(), 7);
    assert_eq!(
        config.identifier_for(roads).unwrap().as_str(),
        "road_centerlines"
    );
}

#[test]
fn test_load_minimal_config_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let temp_file = write_config(
        r#"
[paths]
output_root = "/srv/opendata"
"#,
    );
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.export.map_srs, "EPSG:4326");
    assert_eq!(config.export.ogr2ogr_path, "ogr2ogr");
    assert!(config.catalog.is_none());
    assert!(!config.alerts.enabled);
    assert!(config.datasets.is_empty());
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_CKAN_API_KEY", "substituted-key");

    let temp_file = write_config(
        r#"
[paths]
output_root = "/srv/opendata"

[catalog]
base_url = "https://data.example.org"
# api_key = "${NOT_SET_ANYWHERE}"
api_key = "${TEST_CKAN_API_KEY}"
download_base_url = "https://downloads.example.org/opendata"
"#,
    );
    let config = load_config(temp_file.path()).unwrap();
    assert_eq!(
        config.catalog.unwrap().api_key.expose_secret().as_str(),
        "substituted-key"
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_is_reported() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let temp_file = write_config(
        r#"
[paths]
output_root = "/srv/opendata"

[catalog]
base_url = "https://data.example.org"
api_key = "${TEST_CKAN_API_KEY}"
download_base_url = "https://downloads.example.org/opendata"
"#,
    );
    let err = load_config(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_CKAN_API_KEY"));
}

#[test]
fn test_env_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("GEOPUBLISH_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("GEOPUBLISH_PATHS_OUTPUT_ROOT", "/mnt/downloads");
    std::env::set_var("GEOPUBLISH_CATALOG_API_KEY", "override-key");
    std::env::set_var("GEOPUBLISH_CATALOG_GROUP", "override-group");

    let temp_file = write_config(COMPLETE_CONFIG);
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.paths.output_root.to_str(), Some("/mnt/downloads"));
    let catalog = config.catalog.unwrap();
    assert_eq!(catalog.api_key.expose_secret().as_str(), "override-key");
    assert_eq!(catalog.group.as_deref(), Some("override-group"));

    cleanup_env_vars();
}

#[test]
fn test_publish_without_catalog_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let temp_file = write_config(
        r#"
[paths]
output_root = "/srv/opendata"

[[datasets]]
feature_class = "Parcel"
dataset_name = "Parcels"
execution_mode = "PUBLISH"
"#,
    );
    let err = load_config(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("catalog configuration is required"));
}

#[test]
fn test_colliding_identifiers_are_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let temp_file = write_config(
        r#"
[paths]
output_root = "/srv/opendata"

[[datasets]]
feature_class = "Road"
dataset_name = "Road Centerlines"
execution_mode = "EXPORT"

[[datasets]]
feature_class = "Road2"
dataset_name = "road-centerlines"
execution_mode = "EXPORT"
"#,
    );
    let err = load_config(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("road_centerlines"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let cases = [
        (
            r#"
[application]
log_level = "verbose"

[paths]
output_root = "/srv/opendata"
"#,
            "log_level",
        ),
        (
            r#"
[paths]
output_root = "/srv/opendata"
temp_root = "/srv/opendata"
"#,
            "temp_root",
        ),
        (
            r#"
[paths]
output_root = "/srv/opendata"

[alerts]
enabled = true
"#,
            "webhook_url",
        ),
        (
            r#"
[paths]
output_root = "/srv/opendata"

[export.commands]
dwg = "convert {source}"
"#,
            "{output}",
        ),
    ];

    for (content, expected) in cases {
        let temp_file = write_config(content);
        let err = load_config(temp_file.path()).unwrap_err().to_string();
        assert!(err.contains(expected), "{err} should mention {expected}");
    }
}

#[test]
fn test_load_missing_file() {
    let err = load_config("/nonexistent/geopublish.toml").unwrap_err();
    assert!(err.to_string().contains("not found"));
}
