//! Normalized metadata record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Geographic bounding box in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub east: f64,
    pub north: f64,
    pub south: f64,
}

impl BoundingBox {
    /// Builds a box, rejecting coordinates outside the WGS84 range or an
    /// inverted latitude span
    pub fn new(west: f64, east: f64, north: f64, south: f64) -> Result<Self, String> {
        for (name, value, limit) in [
            ("west", west, 180.0),
            ("east", east, 180.0),
            ("north", north, 90.0),
            ("south", south, 90.0),
        ] {
            if !value.is_finite() || value.abs() > limit {
                return Err(format!("{name} bound {value} is out of range"));
            }
        }

        if south > north {
            return Err(format!("south bound {south} is above north bound {north}"));
        }

        Ok(Self {
            west,
            east,
            north,
            south,
        })
    }

    /// GeoJSON polygon of the box, counter-clockwise
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [self.west, self.south],
                [self.east, self.south],
                [self.east, self.north],
                [self.west, self.north],
                [self.west, self.south]
            ]]
        })
    }
}

/// Normalized metadata extracted from a dataset's metadata document
///
/// `title` and `maintainer_email` are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: String,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    pub maintainer: Option<String>,
    pub maintainer_email: String,
    pub author: Option<String>,
    pub extent: Option<BoundingBox>,
    pub fields: Vec<String>,
    pub source_updated: Option<NaiveDate>,
}

impl MetadataRecord {
    /// Drops fields matching `excluded` (case-insensitive)
    pub fn without_fields<'a>(mut self, excluded: impl IntoIterator<Item = &'a String>) -> Self {
        let excluded: Vec<String> = excluded.into_iter().map(|f| f.to_lowercase()).collect();
        self.fields
            .retain(|f| !excluded.contains(&f.to_lowercase()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_validation() {
        assert!(BoundingBox::new(-105.7, -105.3, 39.9, 39.7).is_ok());
        assert!(BoundingBox::new(-190.0, -105.3, 39.9, 39.7).is_err());
        assert!(BoundingBox::new(-105.7, -105.3, 39.7, 39.9).is_err());
        assert!(BoundingBox::new(f64::NAN, -105.3, 39.9, 39.7).is_err());
    }

    #[test]
    fn test_bounding_box_geojson_ring_closed() {
        let bbox = BoundingBox::new(-105.7, -105.3, 39.9, 39.7).unwrap();
        let geojson = bbox.to_geojson();
        let ring = geojson["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        assert_eq!(geojson["type"], "Polygon");
    }

    #[test]
    fn test_without_fields_case_insensitive() {
        let record = MetadataRecord {
            title: "Parcels".to_string(),
            description: None,
            tags: BTreeSet::new(),
            maintainer: None,
            maintainer_email: "gis@example.org".to_string(),
            author: None,
            extent: None,
            fields: vec!["PARCEL_ID".to_string(), "TEMP1".to_string()],
            source_updated: None,
        };

        let record = record.without_fields(&["temp1".to_string()]);
        assert_eq!(record.fields, vec!["PARCEL_ID".to_string()]);
    }
}
