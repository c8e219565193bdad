//! Structured logging setup using tracing
//!
//! This module provides console output plus optional JSON logs with file
//! rotation. The global filter is reloadable so the pipeline can switch to a
//! dataset's own log level while that dataset runs.
//!
//! # Example
//!
//! ```no_run
//! use geopublish::logging::init_logging;
//! use geopublish::config::LoggingConfig;
//!
//! let config = LoggingConfig::console_only();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//! ```

use crate::config::LoggingConfig;
use crate::domain::{DatasetLogLevel, GeoPublishError, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Layer, Registry};

/// Log file name prefix inside `logging.local_path`
pub const LOG_FILE_NAME: &str = "geopublish.log";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Runtime switch for the crate's log level
///
/// Cloning shares the underlying filter. A disabled switch ignores every
/// call, which is what tests and embedders without [`init_logging`] use.
#[derive(Clone)]
pub struct LevelSwitch {
    handle: Option<FilterHandle>,
    base: String,
}

impl LevelSwitch {
    pub fn disabled() -> Self {
        Self {
            handle: None,
            base: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    /// Filters this crate's events at `level` until [`reset`](Self::reset)
    pub fn set_level(&self, level: DatasetLogLevel) {
        let own = format!("geopublish={}", level.as_directive());
        let mut directives: Vec<&str> = self
            .base
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty() && !d.starts_with("geopublish="))
            .collect();
        directives.push(&own);
        self.apply(&directives.join(","));
    }

    /// Restores the filter installed at startup
    pub fn reset(&self) {
        self.apply(&self.base);
    }

    fn apply(&self, directives: &str) {
        let Some(handle) = &self.handle else {
            return;
        };

        let result = EnvFilter::try_new(directives)
            .map_err(|e| e.to_string())
            .and_then(|filter| handle.reload(filter).map_err(|e| e.to_string()));
        if let Err(e) = result {
            tracing::warn!(directives, error = %e, "Failed to switch log level");
        }
    }
}

impl std::fmt::Debug for LevelSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelSwitch")
            .field("enabled", &self.is_enabled())
            .field("base", &self.base)
            .finish()
    }
}

/// Guard that must be kept alive for the duration of the program
/// to ensure logs are flushed properly
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    levels: LevelSwitch,
}

impl LoggingGuard {
    fn new(file_guard: Option<WorkerGuard>, levels: LevelSwitch) -> Self {
        Self {
            _file_guard: file_guard,
            levels,
        }
    }

    /// Level switch bound to the installed subscriber
    pub fn level_switch(&self) -> LevelSwitch {
        self.levels.clone()
    }
}

/// Initialize the logging system based on configuration
///
/// This function sets up structured logging with:
/// - Console output (always)
/// - JSON file output with rotation when `local_enabled`
/// - A reloadable filter, `RUST_LOG` taking precedence over `log_level_str`
///
/// # Returns
///
/// A `LoggingGuard` that must be kept alive for the duration of the program
pub fn init_logging(log_level_str: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_level = parse_log_level(log_level_str)?;

    let base = std::env::var("RUST_LOG")
        .ok()
        .filter(|v| EnvFilter::try_new(v).is_ok())
        .unwrap_or_else(|| format!("geopublish={}", log_level));
    let env_filter = EnvFilter::try_new(&base)
        .map_err(|e| GeoPublishError::Configuration(format!("Invalid log filter: {e}")))?;
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    let mut layers = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE);

    layers.push(console_layer.boxed());

    let file_guard = if config.local_enabled {
        let rotation = match config.local_rotation.as_str() {
            "hourly" => Rotation::HOURLY,
            "never" => Rotation::NEVER,
            _ => Rotation::DAILY,
        };

        std::fs::create_dir_all(&config.local_path).map_err(|e| {
            GeoPublishError::Configuration(format!(
                "Failed to create log directory {}: {}",
                config.local_path, e
            ))
        })?;

        let file_appender = RollingFileAppender::new(rotation, &config.local_path, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(non_blocking);

        layers.push(file_layer.boxed());
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(layers)
        .try_init()
        .map_err(|e| {
            GeoPublishError::Configuration(format!("Logging already initialized: {e}"))
        })?;

    tracing::info!(
        local_enabled = config.local_enabled,
        local_path = %config.local_path,
        filter = %base,
        "Logging initialized"
    );

    Ok(LoggingGuard::new(
        file_guard,
        LevelSwitch {
            handle: Some(handle),
            base,
        },
    ))
}

/// Parse log level from string
fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(GeoPublishError::Configuration(format!(
            "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
            level_str
        ))),
    }
}
