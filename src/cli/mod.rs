//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for geopublish using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// geopublish - Geospatial export and open data catalog publisher
#[derive(Parser, Debug)]
#[command(name = "geopublish")]
#[command(version, about, long_about = None)]
#[command(author = "geopublish Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "geopublish.toml", env = "GEOPUBLISH_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "GEOPUBLISH_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the configured datasets and publish them to the catalog
    Run(commands::run::RunArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show exported artifacts on disk per dataset
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
