//! VAPID application server key decoding.

use crate::error::PushError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Length of an uncompressed P-256 public point.
pub const RAW_KEY_LEN: usize = 65;

/// Length of the same point wrapped in a DER SubjectPublicKeyInfo.
pub const DER_KEY_LEN: usize = 91;

const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

/// Decodes the server's base64url public key into the raw 65-byte form the
/// push manager takes.
///
/// Standard-alphabet input, padding and stray whitespace are tolerated. A
/// 91-byte DER wrapping is unwrapped by keeping its trailing 65 bytes.
pub fn decode_application_server_key(encoded: &str) -> Result<Vec<u8>, PushError> {
    let normalized: String = encoded
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    if normalized.is_empty() {
        return Err(PushError::InvalidKey("key is empty".to_string()));
    }

    let mut bytes = URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| PushError::InvalidKey(format!("not base64url: {e}")))?;

    if bytes.len() == DER_KEY_LEN {
        tracing::debug!("DER-wrapped VAPID key, extracting raw point");
        bytes.drain(..DER_KEY_LEN - RAW_KEY_LEN);
    }

    validate_raw_key(&bytes)?;
    Ok(bytes)
}

pub fn validate_raw_key(bytes: &[u8]) -> Result<(), PushError> {
    if bytes.len() != RAW_KEY_LEN {
        return Err(PushError::InvalidKey(format!(
            "key is {} bytes, expected {}",
            bytes.len(),
            RAW_KEY_LEN
        )));
    }
    if bytes[0] != UNCOMPRESSED_POINT_TAG {
        return Err(PushError::InvalidKey(format!(
            "first byte is {}, expected 4 (uncompressed P-256 point)",
            bytes[0]
        )));
    }
    Ok(())
}
