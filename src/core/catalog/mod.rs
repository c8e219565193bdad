//! Catalog synchronization
//!
//! Creates or updates the remote catalog entry of an exported dataset.

pub mod reconciler;

pub use reconciler::{
    CatalogReconciler, CatalogSettings, ReconcileOutcome, EXTRA_FIELDS, EXTRA_LAST_PUBLISHED,
    EXTRA_SOURCE_UPDATED, EXTRA_SPATIAL,
};
