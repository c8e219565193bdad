//! Integration tests for logging functionality

use geopublish::config::LoggingConfig;
use geopublish::domain::DatasetLogLevel;
use geopublish::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_path, "logs");
    assert_eq!(config.local_rotation, "daily");
    assert!(!LoggingConfig::console_only().local_enabled);
}

// The global subscriber can be installed once per process, so every
// init_logging assertion lives in this one test
#[test]
fn test_init_logging_with_file_output() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    assert!(init_logging("verbose", &config).is_err());

    let guard = init_logging("debug", &config).expect("Failed to initialize logging");
    assert!(log_path.is_dir());

    let levels = guard.level_switch();
    assert!(levels.is_enabled());
    levels.set_level(DatasetLogLevel::Error);
    tracing::error!("dataset failed");
    levels.reset();
    tracing::info!("back to base level");

    let err = init_logging("info", &LoggingConfig::console_only()).unwrap_err();
    assert!(err.to_string().contains("already initialized"));

    drop(guard);
    let written = std::fs::read_dir(&log_path)
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().starts_with("geopublish.log"));
    assert!(written);
}
