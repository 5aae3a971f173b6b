//! Signed-envelope codec for the WeCom callback protocol.
//!
//! Every callback carries a SHA-1 signature over the sorted request
//! parameters and an AES-256-CBC encrypted body. This module verifies the
//! signature, unwraps the binary envelope, and offers the inverse
//! construction for building signed fixtures.
//!
//! No I/O, no shared state - all operations are pure over the tenant
//! credentials captured at construction.

pub mod envelope;
pub mod signature;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

pub use envelope::EnvelopeCodec;
pub use signature::{compute_signature, verify_signature};

/// Errors produced while verifying or unwrapping a callback envelope.
///
/// All of these surface to the inbound caller as HTTP 400; none of them
/// are retryable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signature mismatch")]
    SignatureInvalid,

    #[error("encoding_aes_key must decode to 32 bytes")]
    InvalidKey,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),

    #[error("receiver app id mismatch")]
    AppIdMismatch,
}

/// Derive the AES-256 key from the vendor-issued `encoding_aes_key`.
///
/// The vendor hands out the key as 43 base64 characters with the trailing
/// padding character stripped; restoring it must yield exactly 32 bytes.
pub fn derive_key(encoding_aes_key: &str) -> Result<[u8; 32], CryptoError> {
    let decoded = STANDARD
        .decode(format!("{encoding_aes_key}="))
        .map_err(|_| CryptoError::InvalidKey)?;
    decoded.try_into().map_err(|_| CryptoError::InvalidKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 43 base64 chars, decodes to exactly 32 bytes
    const FIXTURE_KEY: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQ";

    #[test]
    fn test_derive_key_fixture() {
        let key = derive_key(FIXTURE_KEY).unwrap();
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn test_derive_key_wrong_length() {
        // 23 chars decodes short of 32 bytes
        assert_eq!(
            derive_key("abcdefghijklmnopqrstuvw"),
            Err(CryptoError::InvalidKey)
        );
        assert_eq!(derive_key(""), Err(CryptoError::InvalidKey));
    }

    #[test]
    fn test_derive_key_invalid_base64() {
        assert_eq!(
            derive_key("!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!"),
            Err(CryptoError::InvalidKey)
        );
    }
}
