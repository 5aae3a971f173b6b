//! Listener lifecycle for both addressing modes.
//!
//! Path mode runs one shared listener with per-tenant routes; port mode
//! runs one listener task per tenant. Every listener observes the same
//! cancellation token and [`serve`] returns once all of them have closed.
//! Detached relay tasks are not joined; they are bounded by their own
//! deadline.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::registry::{ListenMode, TenantRegistry};
use crate::relay::RelayClient;
use crate::web::handlers::{tenant_callback, TenantState};

/// Run the configured listeners until the shutdown token fires.
///
/// In path mode a bind failure is fatal (every tenant shares the one
/// listener). In port mode a failing tenant listener is logged and the
/// remaining tenants keep serving.
pub async fn serve(registry: TenantRegistry, shutdown: CancellationToken) -> Result<()> {
    let relay = RelayClient::new()?;

    info!(
        mode = ?registry.mode,
        tenants = registry.tenants.len(),
        "server_starting"
    );

    match registry.mode {
        ListenMode::Path => serve_shared(&registry, relay, shutdown).await?,
        ListenMode::Port => serve_per_tenant(&registry, relay, shutdown).await,
    }

    info!("server_closed");
    Ok(())
}

/// Path mode: one listener, per-tenant routes on a shared router.
async fn serve_shared(
    registry: &TenantRegistry,
    relay: RelayClient,
    shutdown: CancellationToken,
) -> Result<()> {
    let listen = registry.listen.clone().context("listen address missing")?;
    let app = shared_router(registry, &relay);

    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    info!(address = %listen, "listener_bound");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("Server error")?;

    info!(address = %listen, "listener_closed");
    Ok(())
}

/// Port mode: one independent listener task per tenant.
async fn serve_per_tenant(
    registry: &TenantRegistry,
    relay: RelayClient,
    shutdown: CancellationToken,
) {
    let mut handles = Vec::with_capacity(registry.tenants.len());
    for tenant in &registry.tenants {
        let route = format!("listen {}", tenant.listen);
        let state = TenantState::new(Arc::clone(tenant), relay.clone(), route);
        let token = shutdown.clone();

        handles.push(tokio::spawn(async move {
            let listen = state.tenant.listen.clone();
            if let Err(e) = run_tenant_listener(state, token).await {
                error!(address = %listen, error = %e, "tenant_listener_failed");
            }
        }));
    }

    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            error!(error = %e, "listener_task_panicked");
        }
    }
}

async fn run_tenant_listener(state: TenantState, shutdown: CancellationToken) -> Result<()> {
    let listen = state.tenant.listen.clone();
    let path = state.tenant.path.clone();
    let app = tenant_router(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    info!(address = %listen, path = %path, "listener_bound");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .with_context(|| format!("Serve failed on {listen}"))?;

    info!(address = %listen, "listener_closed");
    Ok(())
}

/// Shared router for path mode. Unclaimed paths fall through to axum's
/// default 404.
fn shared_router(registry: &TenantRegistry, relay: &RelayClient) -> Router {
    let mut app = Router::new();
    for tenant in &registry.tenants {
        let route = format!("path {}", tenant.path);
        info!(path = %tenant.path, "tenant_route_added");
        app = app.merge(tenant_router(TenantState::new(
            Arc::clone(tenant),
            relay.clone(),
            route,
        )));
    }
    app.layer(TraceLayer::new_for_http())
}

/// Single-tenant router serving that tenant's one path for all methods.
fn tenant_router(state: TenantState) -> Router {
    let path = state.tenant.path.clone();
    Router::new().route(&path, any(tenant_callback)).with_state(state)
}
