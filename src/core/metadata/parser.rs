//! Metadata document parser
//!
//! Streams FGDC and ArcGIS-native metadata XML with `quick-xml` and maps a
//! fixed set of element paths onto a [`MetadataRecord`]. Parsing is tolerant:
//! problems are collected as [`MetadataIssue`]s and only a missing title or
//! maintainer email makes the record unusable.

use super::slug::Slugifier;
use crate::config::{CatalogConfig, ExportConfig};
use crate::domain::{BoundingBox, MetadataRecord, MetadataValidationError, Result};
use chrono::NaiveDate;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Element a path suffix maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Title,
    Abstract,
    Keyword,
    ContactPerson,
    ContactOrganization,
    ContactEmail,
    Originator,
    West,
    East,
    North,
    South,
    FieldLabel,
    MetadataDate,
    PublicationDate,
    ModificationDate,
}

/// Path suffixes, matched case-insensitively against the element stack
const PATHS: &[(&[&str], Element)] = &[
    // FGDC
    (&["idinfo", "citation", "citeinfo", "title"], Element::Title),
    (&["idinfo", "descript", "abstract"], Element::Abstract),
    (&["theme", "themekey"], Element::Keyword),
    (&["ptcontac", "cntinfo", "cntperp", "cntper"], Element::ContactPerson),
    (&["ptcontac", "cntinfo", "cntorgp", "cntper"], Element::ContactPerson),
    (&["ptcontac", "cntinfo", "cntorgp", "cntorg"], Element::ContactOrganization),
    (&["ptcontac", "cntinfo", "cntperp", "cntorg"], Element::ContactOrganization),
    (&["ptcontac", "cntinfo", "cntemail"], Element::ContactEmail),
    (&["idinfo", "citation", "citeinfo", "origin"], Element::Originator),
    (&["spdom", "bounding", "westbc"], Element::West),
    (&["spdom", "bounding", "eastbc"], Element::East),
    (&["spdom", "bounding", "northbc"], Element::North),
    (&["spdom", "bounding", "southbc"], Element::South),
    (&["eainfo", "detailed", "attr", "attrlabl"], Element::FieldLabel),
    (&["metainfo", "metd"], Element::MetadataDate),
    (&["idinfo", "citation", "citeinfo", "pubdate"], Element::PublicationDate),
    (&["esri", "moddate"], Element::ModificationDate),
    // ArcGIS
    (&["idcitation", "restitle"], Element::Title),
    (&["dataidinfo", "idabs"], Element::Abstract),
    (&["searchkeys", "keyword"], Element::Keyword),
    (&["idpoc", "rpindname"], Element::ContactPerson),
    (&["idpoc", "rporgname"], Element::ContactOrganization),
    (&["idpoc", "rpcntinfo", "cntaddress", "emailadd"], Element::ContactEmail),
    (&["geobndbox", "westbl"], Element::West),
    (&["geobndbox", "eastbl"], Element::East),
    (&["geobndbox", "northbl"], Element::North),
    (&["geobndbox", "southbl"], Element::South),
];

fn match_path(path: &[String]) -> Option<Element> {
    PATHS
        .iter()
        .find(|(suffix, _)| {
            path.len() >= suffix.len()
                && path[path.len() - suffix.len()..]
                    .iter()
                    .zip(suffix.iter())
                    .all(|(name, expected)| name.eq_ignore_ascii_case(expected))
        })
        .map(|(_, element)| *element)
}

/// A non-fatal problem found while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataIssue {
    pub field: &'static str,
    pub message: String,
}

impl MetadataIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for MetadataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Configured fallbacks for values a document does not provide
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataDefaults {
    pub prefix: Option<String>,

    /// Catalog title template with `{name}` and `{prefix}` placeholders
    ///
    /// When set it replaces the document title.
    pub title_template: Option<String>,

    pub maintainer: Option<String>,
    pub maintainer_email: Option<String>,
    pub author: Option<String>,
}

impl MetadataDefaults {
    pub fn from_config(export: &ExportConfig, catalog: Option<&CatalogConfig>) -> Self {
        Self {
            prefix: export.dataset_prefix.clone(),
            title_template: catalog.and_then(|c| c.title_template.clone()),
            maintainer: catalog.and_then(|c| c.maintainer.clone()),
            maintainer_email: catalog.and_then(|c| c.maintainer_email.clone()),
            author: catalog.and_then(|c| c.author.clone()),
        }
    }

    /// Title rendered from the template, or `"<prefix>: <name>"`
    pub fn title(&self, dataset_name: &str) -> String {
        let prefix = self.prefix.as_deref().unwrap_or_default();
        let template = match (&self.title_template, prefix.is_empty()) {
            (Some(template), _) => template.as_str(),
            (None, true) => "{name}",
            (None, false) => "{prefix}: {name}",
        };

        template
            .replace("{prefix}", prefix)
            .replace("{name}", dataset_name)
            .trim()
            .to_string()
    }
}

/// Partial record produced by a tolerant parse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    pub maintainer: Option<String>,
    pub maintainer_email: Option<String>,
    pub author: Option<String>,
    pub extent: Option<BoundingBox>,
    pub fields: Vec<String>,
    pub source_updated: Option<NaiveDate>,
    pub issues: Vec<MetadataIssue>,
}

impl ParsedMetadata {
    /// Required fields that are still missing
    pub fn missing_required(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title".to_string());
        }
        if self.maintainer_email.is_none() {
            missing.push("maintainer_email".to_string());
        }
        missing
    }

    pub fn into_record(self) -> std::result::Result<MetadataRecord, MetadataValidationError> {
        let missing = self.missing_required();
        match (self.title, self.maintainer_email) {
            (Some(title), Some(maintainer_email)) => Ok(MetadataRecord {
                title,
                description: self.description,
                tags: self.tags,
                maintainer: self.maintainer,
                maintainer_email,
                author: self.author,
                extent: self.extent,
                fields: self.fields,
                source_updated: self.source_updated,
            }),
            _ => Err(MetadataValidationError::MissingRequired(missing)),
        }
    }
}

/// Raw values collected while streaming
#[derive(Debug, Default)]
struct Collected {
    title: Option<String>,
    description: Option<String>,
    keywords: Vec<String>,
    person: Option<String>,
    organization: Option<String>,
    email: Option<String>,
    originator: Option<String>,
    west: Option<String>,
    east: Option<String>,
    north: Option<String>,
    south: Option<String>,
    fields: Vec<String>,
    metadata_date: Option<String>,
    publication_date: Option<String>,
    modification_date: Option<String>,
}

impl Collected {
    fn assign(&mut self, element: Element, value: String) {
        let first = |slot: &mut Option<String>, value: String| {
            if slot.is_none() {
                *slot = Some(value);
            }
        };

        match element {
            Element::Title => first(&mut self.title, value),
            Element::Abstract => first(&mut self.description, value),
            Element::Keyword => self.keywords.push(value),
            Element::ContactPerson => first(&mut self.person, value),
            Element::ContactOrganization => first(&mut self.organization, value),
            Element::ContactEmail => first(&mut self.email, value),
            Element::Originator => first(&mut self.originator, value),
            Element::West => first(&mut self.west, value),
            Element::East => first(&mut self.east, value),
            Element::North => first(&mut self.north, value),
            Element::South => first(&mut self.south, value),
            Element::FieldLabel => {
                if !self.fields.iter().any(|f| f.eq_ignore_ascii_case(&value)) {
                    self.fields.push(value);
                }
            }
            Element::MetadataDate => first(&mut self.metadata_date, value),
            Element::PublicationDate => first(&mut self.publication_date, value),
            Element::ModificationDate => first(&mut self.modification_date, value),
        }
    }
}

/// Parses metadata documents into catalog records
#[derive(Debug, Clone)]
pub struct MetadataParser {
    defaults: MetadataDefaults,
    slugifier: Slugifier,
}

impl MetadataParser {
    pub fn new(defaults: MetadataDefaults) -> Result<Self> {
        Ok(Self {
            defaults,
            slugifier: Slugifier::new()?,
        })
    }

    pub fn defaults(&self) -> &MetadataDefaults {
        &self.defaults
    }

    /// Reads and parses the metadata document at `path`
    ///
    /// Issues are logged as warnings.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not well-formed XML, or lacks a
    /// title or maintainer email after defaults are applied.
    pub async fn parse(
        &self,
        path: &Path,
        dataset_name: &str,
    ) -> std::result::Result<MetadataRecord, MetadataValidationError> {
        let xml = tokio::fs::read_to_string(path).await.map_err(|e| {
            MetadataValidationError::Unreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        let parsed = self.parse_str(&xml, dataset_name)?;
        for issue in &parsed.issues {
            tracing::warn!(
                dataset = %dataset_name,
                field = issue.field,
                "Metadata issue: {}",
                issue.message
            );
        }

        let record = parsed.into_record()?;
        tracing::debug!(
            dataset = %dataset_name,
            title = %record.title,
            tags = record.tags.len(),
            fields = record.fields.len(),
            "Parsed metadata"
        );
        Ok(record)
    }

    /// Parses `xml` into a partial record with defaults applied
    ///
    /// Only malformed XML is an error here; everything else is reported in
    /// [`ParsedMetadata::issues`].
    pub fn parse_str(
        &self,
        xml: &str,
        dataset_name: &str,
    ) -> std::result::Result<ParsedMetadata, MetadataValidationError> {
        let collected = collect(xml)?;
        Ok(self.resolve(collected, dataset_name))
    }

    /// Builds a record from configured defaults only
    ///
    /// Used when no metadata artifact exists for a dataset.
    pub fn from_defaults(
        &self,
        dataset_name: &str,
    ) -> std::result::Result<MetadataRecord, MetadataValidationError> {
        ParsedMetadata {
            title: non_empty(self.defaults.title(dataset_name)),
            maintainer: self.defaults.maintainer.clone(),
            maintainer_email: self.defaults.maintainer_email.clone().and_then(non_empty),
            author: self.defaults.author.clone(),
            ..ParsedMetadata::default()
        }
        .into_record()
    }

    fn resolve(&self, collected: Collected, dataset_name: &str) -> ParsedMetadata {
        let mut issues = Vec::new();

        let title = match &self.defaults.title_template {
            Some(_) => non_empty(self.defaults.title(dataset_name)),
            None => collected.title,
        };
        if title.is_none() {
            issues.push(MetadataIssue::new("title", "no title in document"));
        }

        if collected.description.is_none() {
            issues.push(MetadataIssue::new("description", "no abstract in document"));
        }

        let email = match collected.email {
            Some(email) if email.contains('@') => Some(email),
            Some(email) => {
                issues.push(MetadataIssue::new(
                    "maintainer_email",
                    format!("'{email}' is not an email address"),
                ));
                None
            }
            None => None,
        };
        let maintainer_email = email.or_else(|| self.defaults.maintainer_email.clone());
        if maintainer_email.is_none() {
            issues.push(MetadataIssue::new(
                "maintainer_email",
                "no contact email in document or configuration",
            ));
        }

        let tags = collected
            .keywords
            .iter()
            .map(|k| self.slugifier.slugify(k))
            .filter(|slug| !slug.is_empty())
            .collect();

        let extent = resolve_extent(
            [
                collected.west,
                collected.east,
                collected.north,
                collected.south,
            ],
            &mut issues,
        );

        // Edit date first, then publication, then metadata date
        let source_updated = [
            collected.modification_date,
            collected.publication_date,
            collected.metadata_date,
        ]
        .into_iter()
        .flatten()
        .find_map(|raw| {
            let date = parse_date(&raw);
            if date.is_none() {
                issues.push(MetadataIssue::new(
                    "source_updated",
                    format!("unrecognized date '{raw}'"),
                ));
            }
            date
        });

        ParsedMetadata {
            title,
            description: collected.description,
            tags,
            maintainer: collected
                .person
                .or(collected.organization)
                .or_else(|| self.defaults.maintainer.clone()),
            maintainer_email,
            author: collected
                .originator
                .or_else(|| self.defaults.author.clone()),
            extent,
            fields: collected.fields,
            source_updated,
            issues,
        }
    }
}

/// Streams `xml` and collects the text of every mapped element
fn collect(xml: &str) -> std::result::Result<Collected, MetadataValidationError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut collected = Collected::default();
    let mut path: Vec<String> = Vec::new();
    let mut text: Vec<String> = Vec::new();
    let mut seen_root = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            MetadataValidationError::Malformed(format!(
                "at position {}: {}",
                reader.error_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                seen_root = true;
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                text.push(String::new());
            }
            Event::Empty(_) => seen_root = true,
            Event::Text(t) => {
                let value = t
                    .unescape()
                    .map_err(|e| MetadataValidationError::Malformed(e.to_string()))?;
                if let Some(buf) = text.last_mut() {
                    buf.push_str(&value);
                }
            }
            Event::CData(c) => {
                if let Some(buf) = text.last_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                let value = text.pop().unwrap_or_default();
                let value = value.trim();
                if !value.is_empty() {
                    if let Some(element) = match_path(&path) {
                        collected.assign(element, value.to_string());
                    }
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(MetadataValidationError::Malformed(
            "document has no root element".to_string(),
        ));
    }
    if !path.is_empty() {
        return Err(MetadataValidationError::Malformed(format!(
            "unclosed element <{}>",
            path.join("/")
        )));
    }

    Ok(collected)
}

fn resolve_extent(
    bounds: [Option<String>; 4],
    issues: &mut Vec<MetadataIssue>,
) -> Option<BoundingBox> {
    if bounds.iter().all(Option::is_none) {
        return None;
    }

    let mut values = [0.0_f64; 4];
    for (slot, raw) in values.iter_mut().zip(bounds.iter()) {
        let Some(raw) = raw else {
            issues.push(MetadataIssue::new("extent", "incomplete bounding box"));
            return None;
        };
        match raw.trim().parse::<f64>() {
            Ok(v) => *slot = v,
            Err(_) => {
                issues.push(MetadataIssue::new(
                    "extent",
                    format!("'{raw}' is not a coordinate"),
                ));
                return None;
            }
        }
    }

    let [west, east, north, south] = values;
    BoundingBox::new(west, east, north, south)
        .map_err(|e| issues.push(MetadataIssue::new("extent", e)))
        .ok()
}

/// Accepts `YYYYMMDD` and ISO `YYYY-MM-DD[...]` dates
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Some(iso) = raw.get(..10).filter(|s| s.as_bytes().get(4) == Some(&b'-')) {
        return NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok();
    }

    raw.get(..8)
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y%m%d").ok())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
