//! External system integrations for geopublish.
//!
//! This module provides adapters for the collaborators of the pipeline:
//!
//! - [`source`] - Spatial source description (`ogrinfo`)
//! - [`writer`] - Format writers (`ogr2ogr` and configured commands)
//! - [`ckan`] - CKAN catalog transport
//! - [`alert`] - Operator alerts (webhook)
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external tools and
//! services behind traits ([`source::SpatialSource`],
//! [`writer::FormatWriter`], [`ckan::CatalogTransport`],
//! [`alert::Alerter`]) so the pipeline can be tested with in-memory
//! implementations.
//!
//! # CKAN Adapter
//!
//! ```rust,no_run
//! use geopublish::adapters::ckan::{CatalogLookup, CatalogTransport, CkanClient};
//! use geopublish::config::{secret_string, CatalogConfig, RetryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CatalogConfig {
//!     base_url: "https://data.example.org".to_string(),
//!     api_key: secret_string("api-key".to_string()),
//!     download_base_url: "https://downloads.example.org/opendata".to_string(),
//!     title_template: None,
//!     license_id: Some("other-open".to_string()),
//!     group: None,
//!     owner_org: None,
//!     maintainer: None,
//!     maintainer_email: None,
//!     author: None,
//!     timeout_seconds: 60,
//!     tls_verify: true,
//!     retry: RetryConfig::default(),
//! };
//!
//! let client = CkanClient::new(&config)?;
//! if let CatalogLookup::Found(entry) = client.get("parcels").await? {
//!     println!("parcels is at revision {:?}", entry.revision());
//! }
//! # Ok(())
//! # }
//! ```

pub mod alert;
pub mod ckan;
pub mod command;
pub mod source;
pub mod writer;
