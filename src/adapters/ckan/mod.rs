//! Catalog transport adapters
//!
//! The reconciler talks to the remote catalog only through
//! [`CatalogTransport`], so tests can substitute an in-memory catalog for
//! [`CkanClient`].

pub mod client;

use crate::domain::{CatalogEntry, CatalogTransportError};
use async_trait::async_trait;

pub use client::CkanClient;

/// Result of looking up a dataset identifier in the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogLookup {
    NotFound,
    Found(Box<CatalogEntry>),

    /// More than one entry carries the identifier
    Ambiguous(usize),
}

/// Remote catalog operations
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// Looks up the entry named `identifier`
    ///
    /// Entries whose name differs from `identifier` are never reported.
    async fn get(&self, identifier: &str) -> Result<CatalogLookup, CatalogTransportError>;

    /// Creates `entry` and returns the identifier assigned by the catalog
    async fn create(&self, entry: &CatalogEntry) -> Result<String, CatalogTransportError>;

    /// Replaces the entry named `identifier` and returns the stored revision
    async fn update(
        &self,
        identifier: &str,
        entry: &CatalogEntry,
    ) -> Result<u64, CatalogTransportError>;

    /// Resolves a group name to its id, `None` when the group does not exist
    async fn resolve_group(&self, name: &str) -> Result<Option<String>, CatalogTransportError>;
}
