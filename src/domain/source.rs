//! Description of a spatial source as reported by the source collaborator

use serde::{Deserialize, Serialize};

/// Kind of dataset behind a source reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Layer with a geometry column
    FeatureClass,
    /// Attribute-only table
    Table,
}

/// One attribute column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: String,
}

/// Schema and reference system of a source layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescription {
    pub kind: SourceKind,

    /// Name of the geometry column, when the layer has one
    pub geometry_field: Option<String>,

    pub fields: Vec<FieldInfo>,

    /// Native spatial reference, as WKT or authority code
    pub srs: Option<String>,

    pub feature_count: Option<u64>,
}

impl SourceDescription {
    pub fn is_spatial(&self) -> bool {
        self.kind == SourceKind::FeatureClass
    }

    /// Field names for which `excluded` returns false
    pub fn retained_fields(&self, excluded: impl Fn(&str) -> bool) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| f.name.clone())
            .filter(|name| !excluded(name))
            .collect()
    }
}
