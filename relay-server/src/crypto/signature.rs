//! Callback signature computation and verification.
//!
//! The vendor signs every request with SHA-1 over the lexicographically
//! sorted concatenation of `{token, timestamp, nonce, payload}`, where the
//! payload is the challenge string on handshake requests and the encrypted
//! body on message delivery. The ordering is fixed by the protocol and is
//! the same for every tenant.

use sha1::{Digest, Sha1};

/// Compute the expected hex signature for a callback request.
pub fn compute_signature(token: &str, timestamp: &str, nonce: &str, payload: &str) -> String {
    let mut parts = [token, timestamp, nonce, payload];
    parts.sort_unstable();

    let mut hasher = Sha1::new();
    for part in &parts {
        hasher.update(part.as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// Verify a received signature against the recomputed one.
pub fn verify_signature(
    token: &str,
    timestamp: &str,
    nonce: &str,
    payload: &str,
    signature: &str,
) -> bool {
    let expected = compute_signature(token, timestamp, nonce, payload);
    constant_time_compare(&expected, signature)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
