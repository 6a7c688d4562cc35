//! Wire format (JSON envelope)
//!
//! ```text
//! {
//!   "encryptedData": base64( aes_gcm_ct || tag[16] ),
//!   "encryptedKey":  base64( rsa_oaep_sha256(aes_key[32]) )   -> 512 bytes,
//!   "iv":            base64( iv[12] ),
//!   "algorithm":     "RSA-OAEP-4096 + AES-256-GCM",
//!   "timestamp":     ISO-8601
//! }
//! ```
//!
//! Standard base64 alphabet with padding, matching browser `btoa`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::DecryptionFailed;

/// Fixed algorithm identifier carried by every envelope.
pub const ALGORITHM: &str = "RSA-OAEP-4096 + AES-256-GCM";

// ---------------------------------------------------------------------------
// Component sizes
// ---------------------------------------------------------------------------

/// RSA modulus size in bits.
pub const RSA_MODULUS_BITS: usize = 4096;

/// RSA-OAEP ciphertext size: always the modulus length.
pub const WRAPPED_KEY_BYTES: usize = RSA_MODULUS_BITS / 8; // 512

pub const AES_KEY_BYTES: usize = 32;
pub const NONCE_BYTES: usize = 12;
pub const AEAD_TAG_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Largest plaintext accepted for encryption (1 MiB, UTF-8 bytes).
pub const MAX_PLAINTEXT_BYTES: usize = 1024 * 1024;

/// Default ceiling on the serialized envelope, checked before decryption.
pub const DEFAULT_MAX_ENVELOPE_BYTES: usize = 16 * 1024 * 1024;

/// Hard limit applied to every string leaf after decryption (in chars).
pub const MAX_FIELD_CHARS: usize = 10_000;

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 field. Errors are folded into the uniform failure.
pub fn decode(field: &str) -> Result<Vec<u8>, DecryptionFailed> {
    STANDARD.decode(field.trim()).map_err(|_| DecryptionFailed)
}

/// Length of the decoded bytes without allocating, if the input is well formed.
pub fn decoded_len(field: &str) -> Option<usize> {
    let field = field.trim();
    if field.len() % 4 != 0 {
        return None;
    }
    let padding = field.bytes().rev().take_while(|b| *b == b'=').count();
    if padding > 2 {
        return None;
    }
    Some(field.len() / 4 * 3 - padding)
}
