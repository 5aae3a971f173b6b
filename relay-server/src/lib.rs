//! wecom-relay - encrypted WeCom callback receiver and relay.
//!
//! The service sits between the public vendor edge and private callback
//! consumers:
//!
//! ```text
//! Vendor push → Listener → verify + decrypt → 200 OK
//!                                  └→ detached relay → tenant callback URL
//! ```
//!
//! Tenants are validated once at startup into an immutable registry and
//! served either from one shared listener (path mode) or one listener per
//! tenant (port mode). Decoded messages are relayed best-effort; nothing
//! is stored or retried.

pub mod config;
pub mod crypto;
pub mod message;
pub mod registry;
pub mod relay;
pub mod web;

// Re-export commonly used types
pub use config::{OneOrMany, RawConfig, RawTenant};
pub use crypto::{CryptoError, EnvelopeCodec};
pub use message::Envelope;
pub use registry::{validate, ConfigError, ListenMode, TenantConfig, TenantRegistry};
pub use relay::{RelayClient, RELAY_TIMEOUT};
pub use web::{serve, TenantState};
