//! Catalog reconciliation
//!
//! Brings the remote catalog entry of a dataset in line with a freshly
//! parsed [`MetadataRecord`] and the artifacts of an [`ExportResult`]:
//! create on first publish, otherwise merge and bump the revision.

use crate::adapters::ckan::{CatalogLookup, CatalogTransport};
use crate::config::CatalogConfig;
use crate::domain::{
    CatalogConsistencyError, CatalogEntry, CatalogExtra, CatalogGroup, CatalogResource,
    CatalogTag, DatasetIdentifier, ExportResult, FormatTag, GeoPublishError, MetadataRecord,
    Result, INITIAL_REVISION,
};
use chrono::Local;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Extras written by the reconciler; all other extras are preserved
pub const EXTRA_SPATIAL: &str = "spatial";
pub const EXTRA_SOURCE_UPDATED: &str = "source_updated";
pub const EXTRA_LAST_PUBLISHED: &str = "last_published";
pub const EXTRA_FIELDS: &str = "fields";

/// Catalog-wide values applied to every entry
///
/// Configured maintainer, email, author, license, group and organization
/// take precedence over both the record and the stored entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSettings {
    pub download_base_url: Url,
    pub license_id: Option<String>,
    pub group: Option<String>,
    pub owner_org: Option<String>,
    pub maintainer: Option<String>,
    pub maintainer_email: Option<String>,
    pub author: Option<String>,
}

impl CatalogSettings {
    /// # Errors
    ///
    /// Returns a configuration error if `download_base_url` is not a valid
    /// base URL.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let download_base_url = Url::parse(&config.download_base_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| {
                GeoPublishError::Configuration(format!(
                    "Invalid catalog download_base_url '{}'",
                    config.download_base_url
                ))
            })?;

        Ok(Self {
            download_base_url,
            license_id: config.license_id.clone(),
            group: config.group.clone(),
            owner_org: config.owner_org.clone(),
            maintainer: config.maintainer.clone(),
            maintainer_email: config.maintainer_email.clone(),
            author: config.author.clone(),
        })
    }

    /// `{download_base_url}/{id}/{subfolder}/{id}.{ext}`
    pub fn resource_url(&self, identifier: &DatasetIdentifier, format: FormatTag) -> String {
        let file = format!("{}.{}", identifier, format.extension());
        let mut url = self.download_base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([identifier.as_str(), format.subfolder(), file.as_str()]);
        }
        url.to_string()
    }
}

/// Result of one reconcile
#[derive(Debug)]
pub enum ReconcileOutcome {
    Created { revision: u64 },
    Updated { revision: u64 },
    Failed(GeoPublishError),
}

impl ReconcileOutcome {
    pub fn revision(&self) -> Option<u64> {
        match self {
            Self::Created { revision } | Self::Updated { revision } => Some(*revision),
            Self::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Creates or updates catalog entries through a [`CatalogTransport`]
///
/// The reconciler never retries; retry is the transport's concern.
pub struct CatalogReconciler {
    transport: Arc<dyn CatalogTransport>,
    settings: CatalogSettings,
}

impl CatalogReconciler {
    pub fn new(transport: Arc<dyn CatalogTransport>, settings: CatalogSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    /// Reconciles the remote entry named `identifier`
    pub async fn reconcile(
        &self,
        identifier: &DatasetIdentifier,
        record: &MetadataRecord,
        export: &ExportResult,
    ) -> ReconcileOutcome {
        match self.try_reconcile(identifier, record, export).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(identifier = %identifier, error = %e, "Catalog reconcile failed");
                ReconcileOutcome::Failed(e)
            }
        }
    }

    async fn try_reconcile(
        &self,
        identifier: &DatasetIdentifier,
        record: &MetadataRecord,
        export: &ExportResult,
    ) -> Result<ReconcileOutcome> {
        let existing = match self.transport.get(identifier.as_str()).await? {
            CatalogLookup::NotFound => None,
            CatalogLookup::Found(entry) => Some(*entry),
            CatalogLookup::Ambiguous(matches) => {
                return Err(CatalogConsistencyError::Ambiguous {
                    identifier: identifier.to_string(),
                    matches,
                }
                .into())
            }
        };

        let artifacts = digest_artifacts(export).await?;
        let groups = self.resolve_groups().await?;

        match existing {
            None => {
                let entry = self.new_entry(identifier, record, &artifacts, groups);
                let name = self.transport.create(&entry).await?;
                tracing::info!(
                    identifier = %identifier,
                    created = %name,
                    revision = INITIAL_REVISION,
                    resources = entry.resources.len(),
                    "Created catalog entry"
                );
                Ok(ReconcileOutcome::Created {
                    revision: INITIAL_REVISION,
                })
            }
            Some(existing) => {
                let previous = existing.revision().unwrap_or_else(|| {
                    tracing::warn!(
                        identifier = %identifier,
                        version = ?existing.version,
                        "Stored revision missing or not numeric, counting from 0"
                    );
                    0
                });
                let next = previous.checked_add(1).ok_or_else(|| {
                    CatalogConsistencyError::RevisionExhausted {
                        identifier: identifier.to_string(),
                        revision: previous,
                    }
                })?;
                let entry = self.merge_entry(identifier, record, &artifacts, groups, existing, next);
                let revision = self.transport.update(identifier.as_str(), &entry).await?;
                tracing::info!(
                    identifier = %identifier,
                    previous,
                    revision,
                    resources = entry.resources.len(),
                    "Updated catalog entry"
                );
                Ok(ReconcileOutcome::Updated { revision })
            }
        }
    }

    /// Configured group as a membership list
    ///
    /// `None` keeps stored groups; an unknown group yields an empty list.
    async fn resolve_groups(&self) -> Result<Option<Vec<CatalogGroup>>> {
        let Some(name) = self.settings.group.as_deref() else {
            return Ok(None);
        };

        match self.transport.resolve_group(name).await? {
            Some(id) => Ok(Some(vec![CatalogGroup::with_id(id)])),
            None => {
                tracing::warn!(group = %name, "Catalog group not found, publishing without group");
                Ok(Some(Vec::new()))
            }
        }
    }

    fn new_entry(
        &self,
        identifier: &DatasetIdentifier,
        record: &MetadataRecord,
        artifacts: &[ArtifactDigest],
        groups: Option<Vec<CatalogGroup>>,
    ) -> CatalogEntry {
        let settings = &self.settings;
        CatalogEntry {
            id: None,
            name: identifier.to_string(),
            title: record.title.clone(),
            notes: record.description.clone(),
            version: Some(INITIAL_REVISION.to_string()),
            license_id: settings.license_id.clone(),
            owner_org: settings.owner_org.clone(),
            maintainer: settings.maintainer.clone().or_else(|| record.maintainer.clone()),
            maintainer_email: settings
                .maintainer_email
                .clone()
                .or_else(|| Some(record.maintainer_email.clone())),
            author: settings.author.clone().or_else(|| record.author.clone()),
            groups: groups.unwrap_or_default(),
            tags: tags(record),
            resources: self.build_resources(identifier, artifacts, &[]),
            extras: managed_extras(record, &[]),
        }
    }

    fn merge_entry(
        &self,
        identifier: &DatasetIdentifier,
        record: &MetadataRecord,
        artifacts: &[ArtifactDigest],
        groups: Option<Vec<CatalogGroup>>,
        existing: CatalogEntry,
        revision: u64,
    ) -> CatalogEntry {
        let settings = &self.settings;
        let tags = if record.tags.is_empty() {
            existing.tags
        } else {
            tags(record)
        };

        CatalogEntry {
            id: existing.id,
            name: identifier.to_string(),
            title: record.title.clone(),
            notes: record.description.clone().or(existing.notes),
            version: Some(revision.to_string()),
            license_id: settings.license_id.clone().or(existing.license_id),
            owner_org: settings.owner_org.clone().or(existing.owner_org),
            maintainer: settings
                .maintainer
                .clone()
                .or_else(|| record.maintainer.clone())
                .or(existing.maintainer),
            maintainer_email: settings
                .maintainer_email
                .clone()
                .or_else(|| Some(record.maintainer_email.clone())),
            author: settings
                .author
                .clone()
                .or_else(|| record.author.clone())
                .or(existing.author),
            groups: groups.unwrap_or(existing.groups),
            tags,
            resources: self.build_resources(identifier, artifacts, &existing.resources),
            extras: managed_extras(record, &existing.extras),
        }
    }

    /// Resources for the successful artifacts, then foreign-format resources
    ///
    /// Remote ids are reused by format label. Stored resources of known
    /// formats without a fresh artifact are dropped.
    fn build_resources(
        &self,
        identifier: &DatasetIdentifier,
        artifacts: &[ArtifactDigest],
        existing: &[CatalogResource],
    ) -> Vec<CatalogResource> {
        let find_existing = |label: &str| {
            existing
                .iter()
                .find(|r| r.format.trim().eq_ignore_ascii_case(label))
                .and_then(|r| r.id.clone())
        };

        let mut resources: Vec<CatalogResource> = artifacts
            .iter()
            .map(|artifact| {
                let format = artifact.format;
                let label = format.catalog_label();
                CatalogResource {
                    id: find_existing(label),
                    name: format!("{identifier} - {label}"),
                    description: format!("{identifier} - {}", format.description()),
                    url: self.settings.resource_url(identifier, format),
                    format: label.to_string(),
                    mimetype: Some(format.mimetype().to_string()),
                    resource_type: Some("file".to_string()),
                    size: Some(artifact.size),
                    hash: Some(format!("sha256:{}", artifact.sha256)),
                }
            })
            .collect();

        resources.extend(
            existing
                .iter()
                .filter(|r| !is_known_format(&r.format))
                .cloned(),
        );
        resources
    }
}

fn is_known_format(label: &str) -> bool {
    FormatTag::ALL
        .iter()
        .any(|f| f.catalog_label().eq_ignore_ascii_case(label.trim()))
}

fn tags(record: &MetadataRecord) -> Vec<CatalogTag> {
    record
        .tags
        .iter()
        .map(|name| CatalogTag { name: name.clone() })
        .collect()
}

/// Stored unmanaged extras plus the managed ones
///
/// A managed extra without a record value keeps its stored value.
fn managed_extras(record: &MetadataRecord, existing: &[CatalogExtra]) -> Vec<CatalogExtra> {
    let mut extras: BTreeMap<String, String> = existing
        .iter()
        .map(|e| (e.key.clone(), e.value.clone()))
        .collect();

    if let Some(extent) = &record.extent {
        extras.insert(EXTRA_SPATIAL.to_string(), extent.to_geojson().to_string());
    }
    if let Some(date) = record.source_updated {
        extras.insert(
            EXTRA_SOURCE_UPDATED.to_string(),
            date.format("%Y-%m-%d").to_string(),
        );
    }
    if !record.fields.is_empty() {
        extras.insert(EXTRA_FIELDS.to_string(), record.fields.join(","));
    }
    extras.insert(
        EXTRA_LAST_PUBLISHED.to_string(),
        Local::now().format("%Y%m%d").to_string(),
    );

    extras
        .into_iter()
        .map(|(key, value)| CatalogExtra { key, value })
        .collect()
}

/// Size and content hash of one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArtifactDigest {
    format: FormatTag,
    size: u64,
    sha256: String,
}

async fn digest_artifacts(export: &ExportResult) -> Result<Vec<ArtifactDigest>> {
    let paths: Vec<(FormatTag, PathBuf)> = export
        .artifacts()
        .map(|(format, path)| (format, path.to_path_buf()))
        .collect();

    let digests = tokio::task::spawn_blocking(move || {
        paths
            .into_iter()
            .map(|(format, path)| {
                let (size, sha256) = digest_file(&path).map_err(|e| {
                    io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
                })?;
                Ok(ArtifactDigest {
                    format,
                    size,
                    sha256,
                })
            })
            .collect::<io::Result<Vec<_>>>()
    })
    .await
    .map_err(|e| GeoPublishError::Io(e.to_string()))??;

    Ok(digests)
}

fn digest_file(path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let size = io::copy(&mut file, &mut hasher)?;
    Ok((size, format!("{:x}", hasher.finalize())))
}
