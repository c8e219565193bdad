//! Batch orchestration
//!
//! This module runs dataset specs through export and publish and collects
//! the outcome of every dataset into a [`BatchSummary`].

pub mod publish;
pub mod summary;

pub use publish::{build_alert, PublishPipeline};
pub use summary::{BatchSummary, CatalogStatus, DatasetReport, PipelineError, PipelineStage};
