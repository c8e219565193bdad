//! `ogrinfo` backed spatial source

use super::SpatialSource;
use crate::adapters::command::{self, CommandFailure};
use crate::domain::{FieldInfo, SourceDescription, SourceError, SourceKind, SourceRef};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Describes sources by running `ogrinfo -json -so`
#[derive(Debug, Clone)]
pub struct OgrInfoSource {
    program: String,
    timeout: Duration,
}

impl OgrInfoSource {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn arguments(source: &SourceRef) -> Vec<String> {
        let mut args = vec![
            "-json".to_string(),
            "-so".to_string(),
            "-ro".to_string(),
            source.datasource().to_string(),
        ];
        if let Some(layer) = source.layer() {
            args.push(layer.to_string());
        }
        args
    }
}

#[async_trait]
impl SpatialSource for OgrInfoSource {
    async fn describe(&self, source: &SourceRef) -> Result<SourceDescription, SourceError> {
        let args = Self::arguments(source);
        let output = command::run(&self.program, &args, self.timeout)
            .await
            .map_err(|e| match e {
                CommandFailure::Launch { program, source: err } => SourceError::Launch {
                    tool: program,
                    message: err.to_string(),
                },
                other => SourceError::DescribeFailed {
                    source_ref: source.to_string(),
                    message: other.to_string(),
                },
            })?;

        let description = parse_description(&output.stdout, source.layer())?;

        tracing::debug!(
            source = %source,
            kind = ?description.kind,
            fields = description.fields.len(),
            feature_count = ?description.feature_count,
            "Described source"
        );

        Ok(description)
    }
}

#[derive(Debug, Deserialize)]
struct OgrInfoReport {
    #[serde(default)]
    layers: Vec<OgrLayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OgrLayer {
    name: String,
    #[serde(default)]
    feature_count: Option<u64>,
    #[serde(default)]
    geometry_fields: Vec<OgrGeometryField>,
    #[serde(default)]
    fields: Vec<OgrField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OgrGeometryField {
    #[serde(default)]
    name: String,
    #[serde(default)]
    coordinate_system: Option<OgrCoordinateSystem>,
}

#[derive(Debug, Deserialize)]
struct OgrCoordinateSystem {
    #[serde(default)]
    wkt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OgrField {
    name: String,
    #[serde(rename = "type", default)]
    field_type: String,
}

/// Parses `ogrinfo -json` output, selecting `layer` or the first layer
pub fn parse_description(
    json: &str,
    layer: Option<&str>,
) -> Result<SourceDescription, SourceError> {
    let report: OgrInfoReport = serde_json::from_str(json)
        .map_err(|e| SourceError::InvalidDescription(e.to_string()))?;

    let selected = match layer {
        Some(name) => report
            .layers
            .into_iter()
            .find(|l| l.name.eq_ignore_ascii_case(name)),
        None => report.layers.into_iter().next(),
    };

    let Some(selected) = selected else {
        return Err(SourceError::LayerNotFound(
            layer.unwrap_or("<first layer>").to_string(),
        ));
    };

    let geometry = selected.geometry_fields.into_iter().next();
    let kind = if geometry.is_some() {
        SourceKind::FeatureClass
    } else {
        SourceKind::Table
    };

    let (geometry_field, srs) = match geometry {
        Some(g) => {
            let name = (!g.name.is_empty()).then_some(g.name);
            let srs = g.coordinate_system.and_then(|cs| cs.wkt);
            (name, srs)
        }
        None => (None, None),
    };

    Ok(SourceDescription {
        kind,
        geometry_field,
        fields: selected
            .fields
            .into_iter()
            .map(|f| FieldInfo {
                name: f.name,
                field_type: f.field_type,
            })
            .collect(),
        srs,
        feature_count: selected.feature_count,
    })
}
