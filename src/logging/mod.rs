//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with span timings
//! - JSON-formatted local log files with rotation
//! - Per-dataset log levels through a [`LevelSwitch`]
//!
//! # Example
//!
//! ```no_run
//! use geopublish::logging::init_logging;
//! use geopublish::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! // Use tracing macros for logging
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LevelSwitch, LoggingGuard, LOG_FILE_NAME};

/// Log a catalog operation against a dataset identifier
///
/// # Example
///
/// ```no_run
/// use geopublish::log_catalog_operation;
///
/// log_catalog_operation!("buildingfootprints", "package_update", 2);
/// ```
#[macro_export]
macro_rules! log_catalog_operation {
    ($identifier:expr, $action:expr, $revision:expr) => {
        tracing::debug!(
            identifier = %$identifier,
            action = $action,
            revision = $revision,
            "Catalog operation"
        );
    };
}
