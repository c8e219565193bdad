//! CKAN action API client
//!
//! Speaks the CKAN action API v3 (`/api/3/action/<name>`). The API key is
//! sent in the `Authorization` header. Connection failures, timeouts and 5xx
//! responses are retried with exponential backoff; every other error is
//! returned immediately.

use super::{CatalogLookup, CatalogTransport};
use crate::config::{CatalogConfig, RetryConfig, SecretString};
use crate::domain::{CatalogEntry, CatalogTransportError, GeoPublishError, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest response excerpt kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// CKAN catalog client
pub struct CkanClient {
    /// `<base_url>/api/3/action/`
    action_base: String,
    client: Client,
    api_key: SecretString,
    retry: RetryConfig,
}

impl CkanClient {
    /// Builds a client from the catalog configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let action_base = format!("{}/api/3/action/", config.base_url.trim_end_matches('/'));
        url::Url::parse(&action_base).map_err(|e| {
            GeoPublishError::Configuration(format!(
                "Invalid catalog base_url '{}': {}",
                config.base_url, e
            ))
        })?;

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("geopublish/", env!("CARGO_PKG_VERSION")));

        if !config.tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            GeoPublishError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            action_base,
            client,
            api_key: config.api_key.clone(),
            retry: config.retry.clone(),
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}{}", self.action_base, action)
    }

    async fn get_action<T: DeserializeOwned>(
        &self,
        action: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, CatalogTransportError> {
        let url = self.action_url(action);
        tracing::debug!(action, "Calling catalog action");

        self.retry_request(|| async {
            let response = self
                .client
                .get(&url)
                .query(query)
                .header(AUTHORIZATION, self.api_key.expose_secret().as_str())
                .send()
                .await
                .map_err(map_request_error)?;
            read_result(action, response).await
        })
        .await
    }

    async fn post_action<T, B>(
        &self,
        action: &str,
        body: &B,
    ) -> std::result::Result<T, CatalogTransportError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.action_url(action);
        tracing::debug!(action, "Calling catalog action");

        self.retry_request(|| async {
            let response = self
                .client
                .post(&url)
                .json(body)
                .header(AUTHORIZATION, self.api_key.expose_secret().as_str())
                .send()
                .await
                .map_err(map_request_error)?;
            read_result(action, response).await
        })
        .await
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, T, Fut>(
        &self,
        operation: F,
    ) -> std::result::Result<T, CatalogTransportError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, CatalogTransportError>>,
    {
        let max_retries = self.retry.max_retries.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if !e.is_retryable() || attempt >= max_retries {
                        return Err(e);
                    }

                    let delay_ms = backoff_delay_ms(&self.retry, attempt);

                    tracing::warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Retrying catalog request after error"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl CatalogTransport for CkanClient {
    async fn get(
        &self,
        identifier: &str,
    ) -> std::result::Result<CatalogLookup, CatalogTransportError> {
        let query = [
            ("fq", format!("name:\"{identifier}\"")),
            ("include_private", "true".to_string()),
            ("include_drafts", "true".to_string()),
            ("rows", "10".to_string()),
        ];
        let search: SearchResult = self.get_action("package_search", &query).await?;

        let mut exact: Vec<CatalogEntry> = search
            .results
            .into_iter()
            .filter(|entry| entry.name == identifier)
            .collect();

        let count = exact.len();
        let lookup = match count {
            0 => CatalogLookup::NotFound,
            1 => CatalogLookup::Found(Box::new(exact.remove(0))),
            n => CatalogLookup::Ambiguous(n),
        };

        tracing::debug!(identifier, matches = count, "Catalog lookup finished");
        Ok(lookup)
    }

    async fn create(
        &self,
        entry: &CatalogEntry,
    ) -> std::result::Result<String, CatalogTransportError> {
        let created: CatalogEntry = self.post_action("package_create", entry).await?;
        crate::log_catalog_operation!(created.name, "package_create", entry.revision());
        Ok(created.name)
    }

    async fn update(
        &self,
        identifier: &str,
        entry: &CatalogEntry,
    ) -> std::result::Result<u64, CatalogTransportError> {
        let mut body = entry.clone();
        body.name = identifier.to_string();

        let updated: CatalogEntry = self.post_action("package_update", &body).await?;
        let revision = updated.revision().or(body.revision()).ok_or_else(|| {
            CatalogTransportError::InvalidResponse(format!(
                "package_update for {identifier} returned no revision"
            ))
        })?;

        crate::log_catalog_operation!(identifier, "package_update", revision);
        Ok(revision)
    }

    async fn resolve_group(
        &self,
        name: &str,
    ) -> std::result::Result<Option<String>, CatalogTransportError> {
        let query = [
            ("id", name.to_string()),
            ("include_datasets", "false".to_string()),
        ];
        match self.get_action::<GroupResult>("group_show", &query).await {
            Ok(group) => Ok(Some(group.id)),
            Err(CatalogTransportError::Client { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Action API response envelope
#[derive(Debug, Deserialize)]
struct ActionResponse<T> {
    success: bool,
    result: Option<T>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    results: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct GroupResult {
    id: String,
}

/// Delay before retry number `attempt` (1-based)
fn backoff_delay_ms(retry: &RetryConfig, attempt: usize) -> u64 {
    let factor = retry.backoff_multiplier.powf(attempt.saturating_sub(1) as f64);
    let delay = retry.initial_delay_ms as f64 * factor;
    if delay.is_finite() {
        (delay as u64).min(retry.max_delay_ms)
    } else {
        retry.max_delay_ms
    }
}

fn map_request_error(e: reqwest::Error) -> CatalogTransportError {
    if e.is_timeout() {
        CatalogTransportError::Timeout(e.to_string())
    } else {
        CatalogTransportError::Connection(e.to_string())
    }
}

async fn read_result<T: DeserializeOwned>(
    action: &str,
    response: Response,
) -> std::result::Result<T, CatalogTransportError> {
    let status = response.status();
    let body = response.text().await.map_err(map_request_error)?;

    if status.is_server_error() {
        return Err(CatalogTransportError::Server {
            status: status.as_u16(),
            message: excerpt(&body),
        });
    }

    if status.is_success() {
        let envelope: ActionResponse<T> = serde_json::from_str(&body).map_err(|e| {
            CatalogTransportError::InvalidResponse(format!("{action}: {e}"))
        })?;

        if !envelope.success {
            return Err(CatalogTransportError::Rejected(describe_error(
                envelope.error.as_ref(),
                &body,
            )));
        }

        return envelope.result.ok_or_else(|| {
            CatalogTransportError::InvalidResponse(format!("{action} returned no result"))
        });
    }

    let error = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").cloned());
    let message = describe_error(error.as_ref(), &body);
    let is_validation = error
        .as_ref()
        .and_then(|e| e.get("__type"))
        .and_then(|t| t.as_str())
        .is_some_and(|t| t == "Validation Error");

    if status == StatusCode::CONFLICT || is_validation {
        return Err(CatalogTransportError::Rejected(message));
    }

    Err(CatalogTransportError::Client {
        status: status.as_u16(),
        message,
    })
}

/// Human-readable form of a CKAN `error` object
fn describe_error(error: Option<&serde_json::Value>, body: &str) -> String {
    let Some(error) = error else {
        return excerpt(body);
    };

    if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
        return message.to_string();
    }

    match error.as_object() {
        Some(fields) => fields
            .iter()
            .filter(|(key, _)| key.as_str() != "__type")
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join("; "),
        None => excerpt(&error.to_string()),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
