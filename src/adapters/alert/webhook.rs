//! JSON webhook alerter

use super::{Alert, Alerter};
use crate::config::AlertConfig;
use crate::domain::{AlertError, GeoPublishError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use std::time::Duration;

/// Posts alerts as JSON to a webhook endpoint
pub struct WebhookAlerter {
    client: Client,
    url: String,
    recipients: Vec<String>,
    subject_prefix: String,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    severity: String,
    subject: String,
    body: &'a str,
    datasets: &'a [String],
    recipients: &'a [String],
    sent_at: String,
}

impl WebhookAlerter {
    /// # Errors
    ///
    /// Returns a configuration error if no webhook URL is set.
    pub fn new(config: &AlertConfig) -> Result<Self> {
        let url = config
            .webhook_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                GeoPublishError::Configuration(
                    "alerts.webhook_url is required when alerts are enabled".to_string(),
                )
            })?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                GeoPublishError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            url,
            recipients: config.recipients.clone(),
            subject_prefix: config.subject_prefix.clone(),
        })
    }

    fn subject(&self, alert: &Alert) -> String {
        if self.subject_prefix.is_empty() {
            alert.subject.clone()
        } else {
            format!("{} {}", self.subject_prefix, alert.subject)
        }
    }
}

#[async_trait]
impl Alerter for WebhookAlerter {
    async fn send(&self, alert: &Alert) -> std::result::Result<(), AlertError> {
        let payload = WebhookPayload {
            severity: alert.severity.to_string(),
            subject: self.subject(alert),
            body: &alert.body,
            datasets: &alert.datasets,
            recipients: &self.recipients,
            sent_at: Utc::now().to_rfc3339(),
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AlertError::Delivery(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(AlertError::Rejected { status, message });
        }

        tracing::info!(
            severity = %alert.severity,
            datasets = alert.datasets.len(),
            "Alert delivered"
        );
        Ok(())
    }
}
