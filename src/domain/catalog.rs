//! Catalog entry model
//!
//! Mirrors the CKAN package dictionary so the same type is sent to and read
//! from the catalog. Unknown remote keys are ignored on read.

use serde::{Deserialize, Deserializer, Serialize};

/// Revision stored on a freshly created entry
pub const INITIAL_REVISION: u64 = 1;

/// Remote catalog record for one dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Remote primary key, assigned by the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Dataset identifier
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Revision counter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_org: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default)]
    pub groups: Vec<CatalogGroup>,

    #[serde(default)]
    pub tags: Vec<CatalogTag>,

    #[serde(default)]
    pub resources: Vec<CatalogResource>,

    #[serde(default)]
    pub extras: Vec<CatalogExtra>,
}

impl CatalogEntry {
    /// Parsed revision counter, `None` when absent or not numeric
    pub fn revision(&self) -> Option<u64> {
        self.version
            .as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Resource whose format label matches `label` (case-insensitive)
    pub fn resource_by_format(&self, label: &str) -> Option<&CatalogResource> {
        self.resources
            .iter()
            .find(|r| r.format.trim().eq_ignore_ascii_case(label.trim()))
    }
}

/// Group membership reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CatalogGroup {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogExtra {
    pub key: String,
    pub value: String,
}

/// Downloadable resource link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// CKAN returns `null` for unset text fields
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
