//! HTTP ingress for vendor callbacks.
//!
//! This module owns the inbound surface:
//! - Routes each request to its tenant (shared path router or one
//!   listener per tenant, depending on the configured mode)
//! - Verifies and decrypts the signed envelope
//! - Answers handshake challenges
//! - Hands decoded messages to the relay forwarder and returns immediately
//!
//! Relay outcome never influences the inbound response.

pub mod handlers;
pub mod server;

pub use handlers::{tenant_callback, CallbackQuery, TenantState};
pub use server::serve;
