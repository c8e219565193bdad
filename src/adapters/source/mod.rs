//! Spatial source adapters
//!
//! A [`SpatialSource`] reports the schema and reference system of a feature
//! class or table before any format is written. [`OgrInfoSource`] reads it
//! from `ogrinfo -json`.

pub mod ogrinfo;

use crate::domain::{SourceDescription, SourceError, SourceRef};
use async_trait::async_trait;

pub use ogrinfo::OgrInfoSource;

/// Describes feature classes and tables in a source workspace
#[async_trait]
pub trait SpatialSource: Send + Sync {
    /// Reads kind, fields, geometry column and reference system of `source`
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened or the layer does
    /// not exist.
    async fn describe(&self, source: &SourceRef) -> Result<SourceDescription, SourceError>;
}
