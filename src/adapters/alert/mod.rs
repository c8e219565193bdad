//! Alert channel adapters

pub mod webhook;

use crate::config::AlertConfig;
use crate::domain::{AlertError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub use webhook::WebhookAlerter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Warning,
    Error,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("WARNING"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// Operator notification about a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub subject: String,
    pub body: String,

    /// Identifiers of the affected datasets
    pub datasets: Vec<String>,
}

/// Delivers alerts to operators
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn send(&self, alert: &Alert) -> std::result::Result<(), AlertError>;
}

/// Alerter that drops every alert
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlerter;

#[async_trait]
impl Alerter for NoopAlerter {
    async fn send(&self, alert: &Alert) -> std::result::Result<(), AlertError> {
        tracing::debug!(subject = %alert.subject, "Alerting disabled, dropping alert");
        Ok(())
    }
}

/// Builds the configured alerter
///
/// # Errors
///
/// Returns an error if alerts are enabled and the webhook client cannot be
/// built.
pub fn from_config(config: &AlertConfig) -> Result<Arc<dyn Alerter>> {
    if !config.enabled {
        return Ok(Arc::new(NoopAlerter));
    }

    Ok(Arc::new(WebhookAlerter::new(config)?))
}
