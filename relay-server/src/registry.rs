//! Validated tenant registry.
//!
//! [`validate`] turns a [`RawConfig`] into an immutable [`TenantRegistry`]
//! or fails with an error naming the offending tenant by its routing key.
//! Construction is all-or-nothing; the registry is never mutated after it
//! is built and is shared read-only across all listener tasks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::{RawConfig, RawTenant};

/// How inbound requests are routed to tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    /// One listener per tenant, routed by listen address.
    Port,
    /// One shared listener, routed by URL path.
    Path,
}

/// One validated tenant integration.
#[derive(Debug, Clone)]
pub struct TenantConfig {
    /// Listen address; the routing key in port mode.
    pub listen: String,
    /// Normalized URL path (always `/`-prefixed); the routing key in path
    /// mode, and the single served path in port mode.
    pub path: String,
    pub token: String,
    pub app_id: String,
    pub agent_id: u32,
    pub secret: String,
    pub encoding_aes_key: String,
    pub verify_url: bool,
    pub callback: String,
    /// `None` when the config carried no headers.
    pub callback_header: Option<HashMap<String, String>>,
}

impl TenantConfig {
    /// The value that selects this tenant under the given mode.
    pub fn routing_key(&self, mode: ListenMode) -> &str {
        match mode {
            ListenMode::Port => &self.listen,
            ListenMode::Path => &self.path,
        }
    }
}

/// Immutable set of validated tenants, built once at startup.
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    pub mode: ListenMode,
    /// Global listen address (path mode only).
    pub listen: Option<String>,
    pub tenants: Vec<Arc<TenantConfig>>,
}

/// Configuration rejection reasons. All are fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    #[error("listen is empty")]
    MissingListen,

    #[error("service is empty")]
    EmptyServiceList,

    #[error("duplicate {kind}: {key}")]
    DuplicateRoutingKey { kind: &'static str, key: String },

    #[error("{kind}: {key}, {field} is empty")]
    MissingField {
        kind: &'static str,
        key: String,
        field: &'static str,
    },

    #[error("{kind}: {key}, callback only support http/https")]
    InvalidCallback { kind: &'static str, key: String },
}

/// Validate a raw configuration document into a [`TenantRegistry`].
pub fn validate(raw: RawConfig) -> Result<TenantRegistry, ConfigError> {
    let mode = match raw.mode.as_deref() {
        None | Some("") | Some("path") => ListenMode::Path,
        Some("port") => ListenMode::Port,
        Some(other) => return Err(ConfigError::InvalidMode(other.to_string())),
    };

    let listen = raw.listen.filter(|l| !l.is_empty());
    if mode == ListenMode::Path && listen.is_none() {
        return Err(ConfigError::MissingListen);
    }

    let services = raw.service.into_vec();
    if services.is_empty() {
        return Err(ConfigError::EmptyServiceList);
    }

    let kind = match mode {
        ListenMode::Port => "listen",
        ListenMode::Path => "path",
    };

    let mut seen = HashSet::new();
    let mut tenants = Vec::with_capacity(services.len());
    for service in services {
        let tenant = validate_tenant(service, mode, kind)?;
        if !seen.insert(tenant.routing_key(mode).to_string()) {
            return Err(ConfigError::DuplicateRoutingKey {
                kind,
                key: tenant.routing_key(mode).to_string(),
            });
        }
        tenants.push(Arc::new(tenant));
    }

    Ok(TenantRegistry {
        mode,
        listen,
        tenants,
    })
}

fn validate_tenant(
    service: RawTenant,
    mode: ListenMode,
    kind: &'static str,
) -> Result<TenantConfig, ConfigError> {
    let path = normalize_path(&service.path);

    if mode == ListenMode::Port && service.listen.is_empty() {
        return Err(ConfigError::MissingListen);
    }

    let key = match mode {
        ListenMode::Port => &service.listen,
        ListenMode::Path => &path,
    };
    let missing = |field: &'static str| ConfigError::MissingField {
        kind,
        key: key.clone(),
        field,
    };

    if service.token.is_empty() {
        return Err(missing("token"));
    }
    if service.app_id.is_empty() {
        return Err(missing("appid"));
    }
    if service.agent_id <= 0 {
        return Err(missing("agentid"));
    }
    if service.secret.is_empty() {
        return Err(missing("secret"));
    }
    if service.encoding_aes_key.is_empty() {
        return Err(missing("encoding_aes_key"));
    }
    if service.callback.is_empty() {
        return Err(missing("callback"));
    }

    // Bare host:port callback targets are rejected: relay always speaks
    // plain HTTP(S) and needs an unambiguous scheme.
    let scheme_ok = Url::parse(&service.callback)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !scheme_ok {
        return Err(ConfigError::InvalidCallback {
            kind,
            key: key.clone(),
        });
    }

    let callback_header = if service.callback_header.is_empty() {
        None
    } else {
        Some(service.callback_header)
    };

    Ok(TenantConfig {
        listen: service.listen,
        path,
        token: service.token,
        app_id: service.app_id,
        agent_id: service.agent_id as u32,
        secret: service.secret,
        encoding_aes_key: service.encoding_aes_key,
        verify_url: service.verify_url,
        callback: service.callback,
        callback_header,
    })
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if !path.starts_with('/') {
        format!("/{path}")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OneOrMany;

    fn raw_tenant(path: &str) -> RawTenant {
        RawTenant {
            listen: String::new(),
            path: path.to_string(),
            token: "abc".to_string(),
            app_id: "wx1".to_string(),
            agent_id: 1000002,
            secret: "secret".to_string(),
            encoding_aes_key: "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQ".to_string(),
            verify_url: false,
            callback: "http://127.0.0.1:9000/hook".to_string(),
            callback_header: HashMap::new(),
        }
    }

    fn raw_config(tenants: Vec<RawTenant>) -> RawConfig {
        RawConfig {
            mode: None,
            listen: Some("127.0.0.1:8080".to_string()),
            service: OneOrMany::Many(tenants),
        }
    }

    #[test]
    fn test_valid_path_mode_registry() {
        let registry = validate(raw_config(vec![raw_tenant("/a"), raw_tenant("/b")])).unwrap();

        assert_eq!(registry.mode, ListenMode::Path);
        assert_eq!(registry.listen.as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(registry.tenants.len(), 2);
        assert_eq!(registry.tenants[0].routing_key(ListenMode::Path), "/a");
    }

    #[test]
    fn test_empty_path_defaults_to_root() {
        let registry = validate(raw_config(vec![raw_tenant("")])).unwrap();
        assert_eq!(registry.tenants[0].path, "/");
    }

    #[test]
    fn test_path_normalized_with_leading_slash() {
        let registry = validate(raw_config(vec![raw_tenant("callback")])).unwrap();
        assert_eq!(registry.tenants[0].path, "/callback");
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let err = validate(raw_config(vec![raw_tenant("/same"), raw_tenant("same")])).unwrap_err();
        assert_eq!(err.to_string(), "duplicate path: /same");
    }

    #[test]
    fn test_missing_token_names_tenant() {
        let mut tenant = raw_tenant("/a");
        tenant.token = String::new();
        let err = validate(raw_config(vec![tenant])).unwrap_err();
        assert_eq!(err.to_string(), "path: /a, token is empty");
    }

    #[test]
    fn test_zero_agent_id_rejected() {
        let mut tenant = raw_tenant("/a");
        tenant.agent_id = 0;
        let err = validate(raw_config(vec![tenant])).unwrap_err();
        assert_eq!(err.to_string(), "path: /a, agentid is empty");
    }

    #[test]
    fn test_callback_scheme_must_be_http_or_https() {
        let mut tenant = raw_tenant("/a");
        tenant.callback = "ftp://files.example.com/drop".to_string();
        let err = validate(raw_config(vec![tenant])).unwrap_err();
        assert_eq!(err.to_string(), "path: /a, callback only support http/https");
    }

    #[test]
    fn test_bare_host_port_callback_rejected() {
        let mut tenant = raw_tenant("/a");
        tenant.callback = "127.0.0.1:9000".to_string();
        let err = validate(raw_config(vec![tenant])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCallback { .. }));
    }

    #[test]
    fn test_missing_callback_rejected() {
        let mut tenant = raw_tenant("/a");
        tenant.callback = String::new();
        let err = validate(raw_config(vec![tenant])).unwrap_err();
        assert_eq!(err.to_string(), "path: /a, callback is empty");
    }

    #[test]
    fn test_empty_headers_normalized_to_none() {
        let registry = validate(raw_config(vec![raw_tenant("/a")])).unwrap();
        assert!(registry.tenants[0].callback_header.is_none());

        let mut tenant = raw_tenant("/b");
        tenant
            .callback_header
            .insert("X-Env".to_string(), "prod".to_string());
        let registry = validate(raw_config(vec![tenant])).unwrap();
        assert!(registry.tenants[0].callback_header.is_some());
    }

    #[test]
    fn test_empty_service_list_rejected() {
        let err = validate(raw_config(vec![])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyServiceList);
    }

    #[test]
    fn test_path_mode_requires_global_listen() {
        let mut raw = raw_config(vec![raw_tenant("/a")]);
        raw.listen = None;
        assert_eq!(validate(raw).unwrap_err(), ConfigError::MissingListen);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let mut raw = raw_config(vec![raw_tenant("/a")]);
        raw.mode = Some("socket".to_string());
        let err = validate(raw).unwrap_err();
        assert_eq!(err.to_string(), "invalid mode: socket");
    }

    #[test]
    fn test_port_mode_routes_by_listen() {
        let mut a = raw_tenant("");
        a.listen = "127.0.0.1:9001".to_string();
        let mut b = raw_tenant("");
        b.listen = "127.0.0.1:9002".to_string();

        let mut raw = raw_config(vec![a, b]);
        raw.mode = Some("port".to_string());
        raw.listen = None;

        let registry = validate(raw).unwrap();
        assert_eq!(registry.mode, ListenMode::Port);
        assert_eq!(
            registry.tenants[1].routing_key(ListenMode::Port),
            "127.0.0.1:9002"
        );
        // Path still normalized for serving
        assert_eq!(registry.tenants[0].path, "/");
    }

    #[test]
    fn test_port_mode_duplicate_listen_rejected() {
        let mut a = raw_tenant("");
        a.listen = "127.0.0.1:9001".to_string();
        let b = a.clone();

        let mut raw = raw_config(vec![a, b]);
        raw.mode = Some("port".to_string());

        let err = validate(raw).unwrap_err();
        assert_eq!(err.to_string(), "duplicate listen: 127.0.0.1:9001");
    }

    #[test]
    fn test_port_mode_missing_listen_rejected() {
        let mut raw = raw_config(vec![raw_tenant("/a")]);
        raw.mode = Some("port".to_string());
        assert_eq!(validate(raw).unwrap_err(), ConfigError::MissingListen);
    }
}
