//! Error taxonomy for the encryption pipeline.
//!
//! Encryption errors block the submission and surface to the user.
//! Decryption errors never block storage: the caller keeps the envelope
//! as opaque ciphertext and moves on.

use core::fmt;

use thiserror::Error;

/// Uniform failure of a cryptographic step on the decryption path.
///
/// RSA unwrap, IV decoding and GCM tag verification all collapse into this
/// one value so that callers cannot tell which sub-step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptionFailed;

impl fmt::Display for DecryptionFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decryption failed")
    }
}

impl std::error::Error for DecryptionFailed {}

/// Input rejected before any cryptographic work was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cannot encrypt empty data")]
    Empty,

    #[error("data size ({size} bytes) exceeds maximum allowed ({limit} bytes)")]
    TooLarge { size: usize, limit: usize },

    #[error("plaintext is not a JSON object: {0}")]
    NotJson(String),
}

/// Failure of `HybridEncryptor::encrypt`. No partial envelope is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncryptError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("cryptographic primitives unavailable in this environment")]
    CryptoUnavailable,
}

/// Structural violation of the envelope contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeDefect {
    #[error("envelope is not a JSON object: {0}")]
    Unparseable(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("unsupported algorithm `{0}`")]
    UnsupportedAlgorithm(String),

    #[error("envelope size ({size} bytes) exceeds maximum allowed ({limit} bytes)")]
    Oversized { size: usize, limit: usize },
}

/// Failure of `HybridDecryptor::decrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// Protocol violation by the producer, not an operational condition.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] EnvelopeDefect),

    /// Wrong key, corrupted data or tampering. Deliberately carries no detail.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The GCM tag verified but the plaintext is not a JSON object.
    #[error("decrypted plaintext is not a JSON object")]
    MalformedPlaintext,
}

impl DecryptError {
    /// Stable category label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope(_) => "malformed_envelope",
            Self::DecryptionFailed => "decryption_failed",
            Self::MalformedPlaintext => "malformed_plaintext",
        }
    }
}

impl From<DecryptionFailed> for DecryptError {
    fn from(_: DecryptionFailed) -> Self {
        DecryptError::DecryptionFailed
    }
}

/// Pre-submission form check on a report body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("empty fields: {}", .0.join(", "))]
    EmptyFields(Vec<String>),

    #[error("narrative must have at least {min} characters (got {chars})")]
    NarrativeTooShort { chars: usize, min: usize },
}

/// Failure to load or generate RSA key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid PEM key: {0}")]
    InvalidPem(String),

    #[error("unsupported RSA modulus: {bits} bits (expected {expected})")]
    UnsupportedModulus { bits: usize, expected: usize },

    #[error("key generation failed: {0}")]
    Generation(String),

    #[error("cannot read key file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
