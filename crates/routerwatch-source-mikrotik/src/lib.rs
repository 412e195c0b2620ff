// # MikroTik Record Source
//
// Reads hotspot sessions, DHCP leases and interfaces from a RouterOS 7
// router over its REST API.
//
// ## Endpoints
//
// | Resource          | Request                              |
// |-------------------|--------------------------------------|
// | hotspot sessions  | GET `/rest/ip/hotspot/active`        |
// | DHCP leases       | GET `/rest/ip/dhcp-server/lease`     |
// | interfaces        | GET `/rest/interface`                |
//
// Every request uses HTTP basic auth. The response body is handed to the core
// untouched; RouterOS renders every field as a string and the core's record
// decoders cope with that.
//
// ## Trust Level: Untrusted (Plugin)
//
// One request per `fetch`. No retries, no caching: when the router does not
// answer, the cycle is skipped and the schedule tries again.
//
// ## Security
//
// The router password never appears in logs, errors or `Debug` output.

use async_trait::async_trait;
use routerwatch_core::config::SourceConfig;
use routerwatch_core::registry::ComponentRegistry;
use routerwatch_core::traits::{RecordSource, RecordSourceFactory};
use routerwatch_core::{Error, Resource, Result};
use serde_json::Value;
use std::time::Duration;

/// Transport name used in errors and logs
const SOURCE_NAME: &str = "mikrotik";

/// REST path of a resource, relative to `/rest/`
fn resource_path(resource: Resource) -> &'static str {
    match resource {
        Resource::HotspotSessions => "ip/hotspot/active",
        Resource::DhcpLeases => "ip/dhcp-server/lease",
        Resource::Interfaces => "interface",
    }
}

/// RouterOS REST API client
pub struct MikrotikSource {
    /// Router base URL without trailing slash
    base_url: String,

    username: String,

    /// ⚠️ NEVER log this value
    password: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for MikrotikSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MikrotikSource")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl MikrotikSource {
    /// Create a source for one router
    ///
    /// # Parameters
    ///
    /// - `url`: Router base URL (e.g. "https://192.168.88.1")
    /// - `accept_invalid_certs`: Accept the self-signed certificate RouterOS
    ///   ships with
    /// - `timeout`: Per-request timeout
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        accept_invalid_certs: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(url, username, password, client))
    }

    /// Create a source around an existing HTTP client
    pub fn with_client(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        let url = url.into();
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            client,
        }
    }

    /// Full URL of a resource
    pub fn endpoint(&self, resource: Resource) -> String {
        format!("{}/rest/{}", self.base_url, resource_path(resource))
    }
}

#[async_trait]
impl RecordSource for MikrotikSource {
    async fn fetch(&self, resource: Resource) -> Result<Value> {
        let url = self.endpoint(resource);
        tracing::debug!(%resource, url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::transport(SOURCE_NAME, format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return match status.as_u16() {
                401 | 403 => Err(Error::auth(format!(
                    "Router rejected credentials for user '{}'. Status: {}",
                    self.username, status
                ))),
                500..=599 => Err(Error::http(format!(
                    "Router server error (transient): {} - {}",
                    status, error_text
                ))),
                _ => Err(Error::http(format!(
                    "{} request failed: {} - {}",
                    resource, status, error_text
                ))),
            };
        }

        let payload: Value = response.json().await.map_err(|e| {
            Error::transport(
                SOURCE_NAME,
                format!("Failed to parse response: {}", e.without_url()),
            )
        })?;

        if let Value::Array(rows) = &payload {
            tracing::debug!(%resource, rows = rows.len(), "Fetched");
        }
        Ok(payload)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

/// Factory for creating MikroTik sources
pub struct MikrotikSourceFactory;

impl RecordSourceFactory for MikrotikSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn RecordSource>> {
        match config {
            SourceConfig::Mikrotik {
                url,
                username,
                password,
                accept_invalid_certs,
                timeout_secs,
            } => {
                config.validate()?;

                if *accept_invalid_certs {
                    tracing::warn!("Router TLS certificate verification is disabled");
                }

                Ok(Box::new(MikrotikSource::new(
                    url.clone(),
                    username.clone(),
                    password.clone(),
                    *accept_invalid_certs,
                    Duration::from_secs(*timeout_secs),
                )?))
            }
            _ => Err(Error::config("Invalid config for MikroTik source")),
        }
    }
}

/// Register the MikroTik source with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_source(SOURCE_NAME, Box::new(MikrotikSourceFactory));
}
