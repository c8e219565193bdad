//! External process format writer
//!
//! Formats are written by `ogr2ogr` unless `[export.commands]` maps the
//! format to a command template. Templates are split on whitespace before
//! placeholders are substituted, so a substituted value is always exactly
//! one argument even when it contains spaces.
//!
//! | placeholder | value |
//! |---|---|
//! | `{source}` | datasource path or connection |
//! | `{layer}` | source layer (token dropped when absent) |
//! | `{output}` | destination path |
//! | `{fields}` | retained fields, comma separated |
//! | `{exclude_fields}` | excluded fields, comma separated |
//! | `{target_srs}` | map reference system, or empty |
//! | `{transformation}` | datum transformation, or empty |
//! | `{gdb_version}` | geodatabase version |
//! | `{name}` | output layer name |

use super::{FormatWriter, WriteRequest};
use crate::adapters::command;
use crate::config::ExportConfig;
use crate::domain::{FormatExportError, FormatTag, GdbVersion};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Writes formats by running `ogr2ogr` or configured commands
#[derive(Debug, Clone)]
pub struct ProcessWriter {
    ogr2ogr: String,
    commands: BTreeMap<FormatTag, String>,
    timeout: Duration,
}

impl ProcessWriter {
    pub fn new(
        ogr2ogr: impl Into<String>,
        commands: BTreeMap<FormatTag, String>,
        timeout: Duration,
    ) -> Self {
        Self {
            ogr2ogr: ogr2ogr.into(),
            commands,
            timeout,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(
            config.ogr2ogr_path.clone(),
            config.commands.clone(),
            Duration::from_secs(config.command_timeout_seconds),
        )
    }

    /// Program and arguments for `request`
    ///
    /// Returns `None` for the metadata format without a configured command,
    /// which is handled by copying the dataset's metadata document.
    pub fn invocation(
        &self,
        request: &WriteRequest,
    ) -> Result<Option<(String, Vec<String>)>, FormatExportError> {
        if let Some(template) = self.commands.get(&request.format) {
            return render_template(template, request).map(Some);
        }

        let driver = match request.format {
            FormatTag::Metadata => return Ok(None),
            FormatTag::Cad => {
                return Err(FormatExportError::Unsupported {
                    format: request.format,
                    reason: "no command configured in [export.commands] for dwg".to_string(),
                })
            }
            FormatTag::FileGeodatabase
                if matches!(request.gdb_version, GdbVersion::V9_2 | GdbVersion::V9_3) =>
            {
                return Err(FormatExportError::Unsupported {
                    format: request.format,
                    reason: format!(
                        "ogr2ogr cannot write geodatabase version {}; configure a gdb command",
                        request.gdb_version
                    ),
                })
            }
            FormatTag::Shapefile => "ESRI Shapefile",
            FormatTag::Kml => "KML",
            FormatTag::GeoJson => "GeoJSON",
            FormatTag::Csv => "CSV",
            FormatTag::FileGeodatabase => "OpenFileGDB",
        };

        Ok(Some((self.ogr2ogr.clone(), ogr2ogr_arguments(driver, request))))
    }

    async fn copy_metadata(&self, request: &WriteRequest) -> Result<(), FormatExportError> {
        let Some(path) = &request.metadata_path else {
            return Err(FormatExportError::Unsupported {
                format: request.format,
                reason: "dataset has no metadata_path and no metadata command is configured"
                    .to_string(),
            });
        };

        tokio::fs::copy(path, &request.destination)
            .await
            .map_err(|e| FormatExportError::Writer {
                format: request.format,
                message: format!("failed to copy {}: {}", path.display(), e),
            })?;

        Ok(())
    }
}

#[async_trait]
impl FormatWriter for ProcessWriter {
    async fn write(&self, request: &WriteRequest) -> Result<(), FormatExportError> {
        let Some((program, args)) = self.invocation(request)? else {
            return self.copy_metadata(request).await;
        };

        command::run(&program, &args, self.timeout)
            .await
            .map_err(|e| FormatExportError::Writer {
                format: request.format,
                message: e.to_string(),
            })?;

        Ok(())
    }
}

fn ogr2ogr_arguments(driver: &str, request: &WriteRequest) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        driver.to_string(),
        "-overwrite".to_string(),
    ];

    if let Some(reprojection) = &request.reprojection {
        args.push("-t_srs".to_string());
        args.push(reprojection.target_srs.clone());
        if let Some(transformation) = &reprojection.transformation {
            args.push("-ct".to_string());
            args.push(transformation.clone());
        }
    }

    args.push("-select".to_string());
    args.push(request.fields.join(","));
    args.push("-nln".to_string());
    args.push(request.layer_name.clone());

    args.push(request.destination.display().to_string());
    args.push(request.source.datasource().to_string());
    if let Some(layer) = request.source.layer() {
        args.push(layer.to_string());
    }

    args
}

fn render_template(
    template: &str,
    request: &WriteRequest,
) -> Result<(String, Vec<String>), FormatExportError> {
    let mut tokens = template.split_whitespace();
    let Some(program) = tokens.next() else {
        return Err(FormatExportError::Unsupported {
            format: request.format,
            reason: "configured command is empty".to_string(),
        });
    };

    let excluded: Vec<&str> = request.excluded.iter().map(String::as_str).collect();
    let (target_srs, transformation) = match &request.reprojection {
        Some(r) => (r.target_srs.as_str(), r.transformation.as_deref()),
        None => ("", None),
    };

    let values = [
        ("{source}", Some(request.source.datasource().to_string())),
        ("{layer}", request.source.layer().map(str::to_string)),
        ("{output}", Some(request.destination.display().to_string())),
        ("{fields}", Some(request.fields.join(","))),
        ("{exclude_fields}", Some(excluded.join(","))),
        ("{target_srs}", Some(target_srs.to_string())),
        ("{transformation}", transformation.map(str::to_string)),
        ("{gdb_version}", Some(request.gdb_version.to_string())),
        ("{name}", Some(request.layer_name.clone())),
    ];

    let args = tokens
        .filter_map(|token| {
            // A lone placeholder without a value drops the whole argument
            if let Some((_, value)) = values.iter().find(|(key, _)| *key == token) {
                return value.clone();
            }

            let mut rendered = token.to_string();
            for (key, value) in &values {
                if rendered.contains(*key) {
                    rendered = rendered.replace(*key, value.as_deref().unwrap_or(""));
                }
            }
            Some(rendered)
        })
        .collect();

    Ok((program.to_string(), args))
}
