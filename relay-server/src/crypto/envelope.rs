//! AES-256-CBC envelope encryption and the vendor's binary message layout.
//!
//! A decrypted envelope is laid out as:
//!
//! ```text
//! 16 random bytes | u32 BE message length | message bytes | receiver app id
//! ```
//!
//! padded to a 32-byte boundary with PKCS#7-style bytes before encryption.
//! The IV is the first 16 bytes of the derived key.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};

use super::{derive_key, signature, CryptoError};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const AES_BLOCK: usize = 16;
const PAD_BLOCK: usize = 32;

// 16 random bytes + 4 length bytes
const HEADER_LEN: usize = 20;

/// Codec bound to one tenant's credentials.
///
/// Construction derives the symmetric key; a key that does not decode to
/// 32 bytes fails with [`CryptoError::InvalidKey`] before any request data
/// is touched.
pub struct EnvelopeCodec {
    token: String,
    app_id: String,
    key: [u8; 32],
    iv: [u8; 16],
}

impl EnvelopeCodec {
    pub fn new(token: &str, encoding_aes_key: &str, app_id: &str) -> Result<Self, CryptoError> {
        let key = derive_key(encoding_aes_key)?;
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&key[..16]);
        Ok(Self {
            token: token.to_string(),
            app_id: app_id.to_string(),
            key,
            iv,
        })
    }

    /// Verify a handshake challenge and recover the embedded plaintext.
    ///
    /// The echoed challenge is itself a full encrypted envelope; the
    /// recovered message bytes are returned verbatim for the caller to echo
    /// back in the response body.
    pub fn verify_handshake(
        &self,
        timestamp: &str,
        nonce: &str,
        echostr: &str,
        msg_signature: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        if !signature::verify_signature(&self.token, timestamp, nonce, echostr, msg_signature) {
            return Err(CryptoError::SignatureInvalid);
        }
        self.decrypt(echostr)
    }

    /// Verify and decrypt a pushed message, returning the raw XML bytes.
    pub fn decrypt_message(
        &self,
        timestamp: &str,
        nonce: &str,
        encrypted_body: &str,
        msg_signature: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        if !signature::verify_signature(&self.token, timestamp, nonce, encrypted_body, msg_signature)
        {
            return Err(CryptoError::SignatureInvalid);
        }
        self.decrypt(encrypted_body)
    }

    /// Build a signed, encrypted envelope around `plaintext`.
    ///
    /// Returns the base64 ciphertext and its signature. This is the inverse
    /// of [`decrypt_message`](Self::decrypt_message) and exists so callers
    /// (and tests) can construct valid fixtures without a live vendor.
    pub fn encrypt_message(
        &self,
        plaintext: &[u8],
        timestamp: &str,
        nonce: &str,
    ) -> (String, String) {
        let prefix: [u8; 16] = rand::random();

        let mut buf =
            Vec::with_capacity(HEADER_LEN + plaintext.len() + self.app_id.len() + PAD_BLOCK);
        buf.extend_from_slice(&prefix);
        buf.extend_from_slice(&(plaintext.len() as u32).to_be_bytes());
        buf.extend_from_slice(plaintext);
        buf.extend_from_slice(self.app_id.as_bytes());
        pad_pkcs7(&mut buf);

        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<NoPadding>(&buf);
        let encoded = STANDARD.encode(ciphertext);
        let sig = signature::compute_signature(&self.token, timestamp, nonce, &encoded);

        (encoded, sig)
    }

    fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, CryptoError> {
        let data = STANDARD
            .decode(encoded)
            .map_err(|_| CryptoError::MalformedEnvelope("invalid base64"))?;
        if data.is_empty() || data.len() % AES_BLOCK != 0 {
            return Err(CryptoError::MalformedEnvelope("ciphertext length"));
        }

        let padded = Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<NoPadding>(&data)
            .map_err(|_| CryptoError::MalformedEnvelope("block decrypt"))?;
        let plain = strip_pkcs7(padded)?;

        self.unwrap_plaintext(&plain)
    }

    /// Split the decrypted buffer into its framed parts and check the
    /// trailing receiver id against this tenant's app id.
    fn unwrap_plaintext(&self, plain: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if plain.len() < HEADER_LEN {
            return Err(CryptoError::MalformedEnvelope("truncated header"));
        }
        let len =
            u32::from_be_bytes([plain[16], plain[17], plain[18], plain[19]]) as usize;
        let rest = &plain[HEADER_LEN..];
        if len > rest.len() {
            return Err(CryptoError::MalformedEnvelope("message length overruns buffer"));
        }

        let (message, receiver) = rest.split_at(len);
        if receiver != self.app_id.as_bytes() {
            return Err(CryptoError::AppIdMismatch);
        }

        Ok(message.to_vec())
    }
}

fn pad_pkcs7(buf: &mut Vec<u8>) {
    let pad = PAD_BLOCK - buf.len() % PAD_BLOCK;
    buf.extend(std::iter::repeat(pad as u8).take(pad));
}

fn strip_pkcs7(mut buf: Vec<u8>) -> Result<Vec<u8>, CryptoError> {
    let pad = *buf
        .last()
        .ok_or(CryptoError::MalformedEnvelope("empty plaintext"))? as usize;
    if pad == 0 || pad > PAD_BLOCK || pad > buf.len() {
        return Err(CryptoError::MalformedEnvelope("bad padding"));
    }
    buf.truncate(buf.len() - pad);
    Ok(buf)
}
