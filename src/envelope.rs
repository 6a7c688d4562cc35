//! The Envelope: the only value that crosses the trust boundary.
//!
//! An Envelope is immutable. The encryptor builds it, transport carries it
//! as-is, and the decryptor consumes it. Storage layers that need to rebuild
//! one from columns use [`Envelope::from_parts`], which takes every field at
//! once.

use core::fmt;
use std::io;

use serde::{Deserialize, Serialize};

use crate::error::EnvelopeDefect;
use crate::wire::{self, AEAD_TAG_BYTES, ALGORITHM, NONCE_BYTES, WRAPPED_KEY_BYTES};

/// Hybrid-encrypted report body, as sent over the wire.
///
/// Missing fields deserialize as empty strings so that an incomplete object
/// is reported by [`Envelope::validate_shape`] as a malformed envelope rather
/// than as a serde error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    encrypted_data: String,
    #[serde(default)]
    encrypted_key: String,
    #[serde(default)]
    iv: String,
    #[serde(default)]
    algorithm: String,
    #[serde(default)]
    timestamp: String,
}

impl Envelope {
    /// Fresh envelope from the encryptor. Always carries the fixed algorithm tag.
    pub(crate) fn sealed(encrypted_data: String, encrypted_key: String, iv: String, timestamp: String) -> Self {
        Self {
            encrypted_data,
            encrypted_key,
            iv,
            algorithm: ALGORITHM.to_owned(),
            timestamp,
        }
    }

    /// Rebuild a whole envelope from stored or transported parts.
    pub fn from_parts(
        encrypted_data: impl Into<String>,
        encrypted_key: impl Into<String>,
        iv: impl Into<String>,
        algorithm: Option<String>,
        timestamp: Option<String>,
    ) -> Self {
        Self {
            encrypted_data: encrypted_data.into(),
            encrypted_key: encrypted_key.into(),
            iv: iv.into(),
            algorithm: algorithm.unwrap_or_default(),
            timestamp: timestamp.unwrap_or_default(),
        }
    }

    /// Parse an envelope from JSON text, refusing anything over `limit` bytes
    /// before the parser sees it.
    pub fn from_json(text: &str, limit: usize) -> Result<Self, EnvelopeDefect> {
        if text.len() > limit {
            return Err(EnvelopeDefect::Oversized {
                size: text.len(),
                limit,
            });
        }
        serde_json::from_str(text).map_err(|e| EnvelopeDefect::Unparseable(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> String {
        // Serializing a struct of plain strings cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn encrypted_data(&self) -> &str {
        &self.encrypted_data
    }

    pub fn encrypted_key(&self) -> &str {
        &self.encrypted_key
    }

    pub fn iv(&self) -> &str {
        &self.iv
    }

    /// Algorithm tag as received. Empty when the producer omitted it.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Creation time, informational only.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Structural check run before any cryptographic step.
    ///
    /// The three payload fields must be non-empty. The algorithm tag must be
    /// the fixed identifier; an absent or empty tag is read as the default.
    pub fn validate_shape(&self) -> Result<(), EnvelopeDefect> {
        for (name, value) in [
            ("encryptedData", &self.encrypted_data),
            ("encryptedKey", &self.encrypted_key),
            ("iv", &self.iv),
        ] {
            if value.trim().is_empty() {
                return Err(EnvelopeDefect::MissingField(name));
            }
        }
        let algorithm = self.algorithm.trim();
        if !algorithm.is_empty() && algorithm != ALGORITHM {
            return Err(EnvelopeDefect::UnsupportedAlgorithm(algorithm.to_owned()));
        }
        Ok(())
    }

    /// Length of the compact JSON serialization, computed without buffering it.
    pub fn serialized_len(&self) -> usize {
        let mut counter = ByteCounter(0);
        match serde_json::to_writer(&mut counter, self) {
            Ok(()) => counter.0,
            Err(_) => usize::MAX,
        }
    }

    /// Reject envelopes whose serialized form exceeds `limit` bytes.
    pub fn check_size(&self, limit: usize) -> Result<(), EnvelopeDefect> {
        let size = self.serialized_len();
        if size > limit {
            return Err(EnvelopeDefect::Oversized { size, limit });
        }
        Ok(())
    }

    /// Metadata without decryption. Safe to log: reveals sizes only.
    pub fn inspect(&self) -> Result<EnvelopeInfo, EnvelopeDefect> {
        self.validate_shape()?;

        let data_bytes = wire::decoded_len(&self.encrypted_data);
        let wrapped_key_bytes = wire::decoded_len(&self.encrypted_key);
        let iv_bytes = wire::decoded_len(&self.iv);

        Ok(EnvelopeInfo {
            algorithm: if self.algorithm.trim().is_empty() {
                ALGORITHM.to_owned()
            } else {
                self.algorithm.trim().to_owned()
            },
            timestamp: self.timestamp.clone(),
            serialized_bytes: self.serialized_len(),
            data_bytes,
            plaintext_bytes: data_bytes.and_then(|n| n.checked_sub(AEAD_TAG_BYTES)),
            wrapped_key_bytes,
            iv_bytes,
            key_matches_modulus: wrapped_key_bytes == Some(WRAPPED_KEY_BYTES),
            iv_is_standard: iv_bytes == Some(NONCE_BYTES),
        })
    }
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

/// Envelope metadata.
///
/// `None` sizes mean the field is not valid base64. A wrapped key that is not
/// 512 bytes usually means the client encrypted to a stale or wrong-sized key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeInfo {
    pub algorithm: String,
    pub timestamp: String,
    pub serialized_bytes: usize,
    pub data_bytes: Option<usize>,
    pub plaintext_bytes: Option<usize>,
    pub wrapped_key_bytes: Option<usize>,
    pub iv_bytes: Option<usize>,
    pub key_matches_modulus: bool,
    pub iv_is_standard: bool,
}

fn size_or_invalid(size: Option<usize>) -> String {
    size.map_or_else(|| "invalid".to_owned(), |n| n.to_string())
}

impl fmt::Display for EnvelopeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | key {} bytes ({}) | iv {} bytes | {} bytes ({} plaintext)",
            self.algorithm,
            if self.timestamp.is_empty() { "no timestamp" } else { &self.timestamp },
            size_or_invalid(self.wrapped_key_bytes),
            if self.key_matches_modulus { "ok" } else { "stale key?" },
            size_or_invalid(self.iv_bytes),
            size_or_invalid(self.data_bytes),
            size_or_invalid(self.plaintext_bytes),
        )
    }
}
