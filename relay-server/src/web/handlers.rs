//! Per-request dispatch: verify, decrypt, schedule relay, respond.
//!
//! The handler is deliberately short-lived. It returns as soon as the
//! envelope is decoded; the relay runs as a detached task with its own
//! deadline, so response latency is independent of the downstream
//! consumer.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{error, info};

use crate::crypto::EnvelopeCodec;
use crate::message::Envelope;
use crate::registry::TenantConfig;
use crate::relay::RelayClient;

/// Per-tenant request state. One instance per registered route.
#[derive(Clone)]
pub struct TenantState {
    pub tenant: Arc<TenantConfig>,
    pub relay: RelayClient,
    /// Log label identifying the tenant by its routing key.
    pub route: Arc<str>,
}

impl TenantState {
    pub fn new(tenant: Arc<TenantConfig>, relay: RelayClient, route: String) -> Self {
        Self {
            tenant,
            relay,
            route: route.into(),
        }
    }
}

/// Query parameters common to handshake and message delivery.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub msg_signature: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub echostr: String,
}

/// Tenant callback endpoint, shared by both addressing modes.
pub async fn tenant_callback(
    State(state): State<TenantState>,
    method: Method,
    Query(query): Query<CallbackQuery>,
    body: Bytes,
) -> Response {
    if method != Method::GET && method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed").into_response();
    }

    if state.tenant.verify_url && !query.echostr.is_empty() {
        return handle_handshake(&state, &query);
    }

    handle_message(&state, &query, &body)
}

/// GET challenge: decrypt the echo string and return its plaintext.
fn handle_handshake(state: &TenantState, query: &CallbackQuery) -> Response {
    let codec = match codec_for(state) {
        Ok(codec) => codec,
        Err(resp) => return resp,
    };

    match codec.verify_handshake(
        &query.timestamp,
        &query.nonce,
        &query.echostr,
        &query.msg_signature,
    ) {
        Ok(plaintext) => {
            info!(route = %state.route, "handshake_verified");
            (StatusCode::OK, plaintext).into_response()
        }
        Err(e) => {
            error!(route = %state.route, error = %e, "handshake_failed");
            bad_request()
        }
    }
}

/// POST delivery: verify, decrypt, parse, then schedule the relay and
/// answer 200 without waiting for it.
fn handle_message(state: &TenantState, query: &CallbackQuery, body: &Bytes) -> Response {
    let codec = match codec_for(state) {
        Ok(codec) => codec,
        Err(resp) => return resp,
    };

    let encrypted_body = match std::str::from_utf8(body) {
        Ok(body) => body,
        Err(_) => {
            error!(route = %state.route, "request_body_not_utf8");
            return bad_request();
        }
    };

    let raw_xml = match codec.decrypt_message(
        &query.timestamp,
        &query.nonce,
        encrypted_body,
        &query.msg_signature,
    ) {
        Ok(raw) => raw,
        Err(e) => {
            error!(route = %state.route, error = %e, "envelope_decrypt_failed");
            return bad_request();
        }
    };

    let envelope = match Envelope::from_xml(&raw_xml) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(route = %state.route, error = %e, "envelope_parse_failed");
            return bad_request();
        }
    };

    info!(
        route = %state.route,
        msg_type = envelope.msg_type.as_deref().unwrap_or(""),
        msg_id = envelope.msg_id.unwrap_or(0),
        "envelope_decoded"
    );

    let relay = state.relay.clone();
    let tenant = Arc::clone(&state.tenant);
    let route = Arc::clone(&state.route);
    tokio::spawn(async move {
        relay.relay(&route, &envelope, &tenant).await;
    });

    StatusCode::OK.into_response()
}

fn codec_for(state: &TenantState) -> Result<EnvelopeCodec, Response> {
    EnvelopeCodec::new(
        &state.tenant.token,
        &state.tenant.encoding_aes_key,
        &state.tenant.app_id,
    )
    .map_err(|e| {
        error!(route = %state.route, error = %e, "codec_init_failed");
        bad_request()
    })
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "400 Bad Request").into_response()
}
