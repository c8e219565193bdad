//! Core pipeline logic
//!
//! This module contains the business logic of geopublish:
//! - [`export`] - Format exporters and the per-dataset export coordinator
//! - [`metadata`] - Metadata document parsing
//! - [`catalog`] - Catalog entry reconciliation
//! - [`pipeline`] - Batch orchestration and reporting

pub mod catalog;
pub mod export;
pub mod metadata;
pub mod pipeline;
