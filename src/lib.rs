// geopublish - Geospatial export and open data catalog publisher
// Copyright (c) 2025 geopublish Contributors
// Licensed under the MIT License

//! # geopublish - Geospatial export and catalog publishing
//!
//! geopublish exports feature classes and tables from a spatial workspace
//! into open data download formats and keeps one CKAN catalog entry per
//! dataset in sync with what was exported.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Exporting** a dataset to shapefile, CAD, KML, GeoJSON, CSV, metadata
//!   XML and archived file geodatabase, tolerating per-format failures
//! - **Parsing** FGDC and ArcGIS metadata into a catalog record
//! - **Reconciling** the record with the remote catalog, creating the entry
//!   at revision 1 or updating it with the revision incremented
//! - **Alerting** once per run when production datasets fail or degrade
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (export, metadata, catalog, pipeline)
//! - [`adapters`] - External integrations (OGR tools, CKAN, alert webhook)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geopublish::config::load_config;
//! use geopublish::core::pipeline::PublishPipeline;
//! use geopublish::logging::LevelSwitch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("geopublish.toml")?;
//!     let pipeline = PublishPipeline::from_config(&config, LevelSwitch::disabled())?;
//!
//!     let summary = pipeline.run(&config.datasets).await;
//!     println!("{} of {} datasets succeeded", summary.succeeded(), summary.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::Result`] with [`domain::GeoPublishError`];
//! per-format failures are recorded in the [`domain::ExportResult`] instead
//! of aborting the dataset.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
