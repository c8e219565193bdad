//! Domain identifier types with validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dataset identifier newtype wrapper
///
/// The identifier is both the catalog entry name and the name of the local
/// output folder. It only contains lower-case ASCII letters, digits and
/// underscores.
///
/// # Examples
///
/// ```
/// use geopublish::domain::ids::DatasetIdentifier;
///
/// let id = DatasetIdentifier::derive("Gilpin County - Building-Footprints", Some("Gilpin County")).unwrap();
/// assert_eq!(id.as_str(), "building_footprints");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetIdentifier(String);

impl DatasetIdentifier {
    /// Creates a new DatasetIdentifier from an already normalized string
    ///
    /// # Returns
    ///
    /// Returns `Ok(DatasetIdentifier)` if the ID is valid, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Dataset identifier cannot be empty".to_string());
        }

        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
        {
            return Err(format!(
                "Invalid character '{c}' in dataset identifier '{id}'. Only a-z, 0-9 and '_' are allowed"
            ));
        }

        Ok(Self(id))
    }

    /// Derives the identifier from a human dataset name
    ///
    /// Strips `prefix` (case-insensitive) when the name starts with it, trims
    /// leading separators, lower-cases, and replaces dashes and whitespace
    /// with underscores.
    pub fn derive(dataset_name: &str, prefix: Option<&str>) -> Result<Self, String> {
        let mut name = dataset_name.trim();

        if let Some(prefix) = prefix.map(str::trim).filter(|p| !p.is_empty()) {
            let head = name.get(..prefix.len());
            if head.is_some_and(|h| h.eq_ignore_ascii_case(prefix)) {
                name = &name[prefix.len()..];
            }
        }

        let name = name.trim_start_matches(|c: char| {
            c == '-' || c == '_' || c == ':' || c.is_whitespace()
        });

        let normalized: String = name
            .trim_end()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
            .collect();

        Self::new(normalized)
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DatasetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DatasetIdentifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DatasetIdentifier> for String {
    fn from(id: DatasetIdentifier) -> Self {
        id.0
    }
}

impl AsRef<str> for DatasetIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_new_valid() {
        let id = DatasetIdentifier::new("building_footprints").unwrap();
        assert_eq!(id.as_str(), "building_footprints");
        assert_eq!(id.to_string(), "building_footprints");
    }

    #[test]
    fn test_identifier_new_rejects_invalid() {
        assert!(DatasetIdentifier::new("").is_err());
        assert!(DatasetIdentifier::new("   ").is_err());
        assert!(DatasetIdentifier::new("Upper").is_err());
        assert!(DatasetIdentifier::new("has-dash").is_err());
        assert!(DatasetIdentifier::new("dot.name").is_err());
    }

    #[test]
    fn test_derive_lowercases_name() {
        let id = DatasetIdentifier::derive("BuildingFootprints", None).unwrap();
        assert_eq!(id.as_str(), "buildingfootprints");
    }

    #[test]
    fn test_derive_replaces_dashes() {
        let id = DatasetIdentifier::derive("Road-Centerlines", None).unwrap();
        assert_eq!(id.as_str(), "road_centerlines");
    }

    #[test]
    fn test_derive_strips_prefix_case_insensitively() {
        let id = DatasetIdentifier::derive("gilpin-county-Parcels", Some("Gilpin-County")).unwrap();
        assert_eq!(id.as_str(), "parcels");

        let id = DatasetIdentifier::derive("Gilpin County: Zoning", Some("Gilpin County")).unwrap();
        assert_eq!(id.as_str(), "zoning");
    }

    #[test]
    fn test_derive_keeps_name_without_prefix() {
        let id = DatasetIdentifier::derive("Parcels", Some("Gilpin County")).unwrap();
        assert_eq!(id.as_str(), "parcels");
    }

    #[test]
    fn test_derive_prefix_only_is_error() {
        assert!(DatasetIdentifier::derive("Gilpin County", Some("Gilpin County")).is_err());
    }

    #[test]
    fn test_identifier_serde_validates() {
        let id: DatasetIdentifier = serde_json::from_str("\"parcels\"").unwrap();
        assert_eq!(id.as_str(), "parcels");
        assert!(serde_json::from_str::<DatasetIdentifier>("\"Bad Name\"").is_err());
    }
}
