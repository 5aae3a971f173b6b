//! Relay forwarder - fire-and-forget delivery of decoded messages.
//!
//! Each decoded envelope is posted as JSON to the tenant's callback URL
//! from a detached task. Delivery is strictly best-effort: failures are
//! logged and discarded, and the inbound request never waits on (or learns
//! about) the outcome.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use tracing::{error, info, warn};

use crate::message::Envelope;
use crate::registry::TenantConfig;

/// Outbound deadline per relay attempt. In-flight relays are bounded by
/// this alone; shutdown does not cancel them.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared outbound HTTP client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct RelayClient {
    http: Client,
}

impl RelayClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(100)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http })
    }

    /// Post a decoded envelope to the tenant's callback URL.
    ///
    /// Tenant headers are applied after the defaults, so they may overwrite
    /// `Content-Type` but can never remove it.
    pub async fn relay(&self, route: &str, envelope: &Envelope, tenant: &TenantConfig) {
        let body = match serde_json::to_vec(envelope) {
            Ok(body) => body,
            Err(e) => {
                error!(route = route, error = %e, "relay_serialize_failed");
                return;
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(custom) = &tenant.callback_header {
            for (name, value) in custom {
                match (
                    HeaderName::try_from(name.as_str()),
                    HeaderValue::try_from(value.as_str()),
                ) {
                    (Ok(name), Ok(value)) => {
                        headers.insert(name, value);
                    }
                    _ => warn!(route = route, header = %name, "relay_header_invalid"),
                }
            }
        }

        let result = self
            .http
            .post(&tenant.callback)
            .timeout(RELAY_TIMEOUT)
            .headers(headers)
            .body(body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!(
                    route = route,
                    status_code = resp.status().as_u16(),
                    "relay_delivered"
                );
            }
            Ok(resp) => {
                error!(
                    route = route,
                    status_code = resp.status().as_u16(),
                    "relay_rejected"
                );
            }
            Err(e) if e.is_timeout() => {
                error!(
                    route = route,
                    timeout_seconds = RELAY_TIMEOUT.as_secs(),
                    error = %e,
                    "relay_timeout"
                );
            }
            Err(e) => {
                error!(route = route, error = %e, "relay_failed");
            }
        }
    }
}
