//! Raw configuration document model.
//!
//! The operator supplies a JSON document selecting the addressing mode and
//! listing tenant integrations. This module only describes the document
//! shape; all validation and normalization happens in
//! [`registry::validate`](crate::registry::validate).

use std::collections::HashMap;

use serde::Deserialize;

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    /// Addressing mode: `"port"` or `"path"` (default).
    #[serde(default)]
    pub mode: Option<String>,

    /// Global listen address, required in path mode.
    #[serde(default)]
    pub listen: Option<String>,

    /// Tenant list; a single object is accepted as a one-element list.
    #[serde(default)]
    pub service: OneOrMany<RawTenant>,
}

/// One tenant integration as written in the config file.
///
/// Field names match the vendor's credential terminology.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTenant {
    /// Listen address; the routing key in port mode.
    #[serde(default)]
    pub listen: String,

    /// URL path; the routing key in path mode. Defaults to `/`.
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub agent_id: i64,

    #[serde(default)]
    pub secret: String,

    #[serde(default)]
    pub encoding_aes_key: String,

    /// Answer GET handshake challenges on this endpoint.
    #[serde(default)]
    pub verify_url: bool,

    /// Downstream URL decoded messages are relayed to.
    #[serde(default)]
    pub callback: String,

    /// Extra headers injected into every relay request.
    #[serde(default)]
    pub callback_header: HashMap<String, String>,
}

/// Accepts either a bare value or a list of values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}
