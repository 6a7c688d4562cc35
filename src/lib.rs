//! # siiec-envelope
//!
//! Hybrid end-to-end encryption for anonymous incident reports.
//!
//! The submitting device seals a JSON report body under a one-time
//! AES-256-GCM key and wraps that key with the recipient's RSA-4096 public
//! key (OAEP, SHA-256). The result travels as a JSON [`Envelope`]. Only the
//! holder of the matching private key can open it, and every opened body is
//! sanitized before anyone reads it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use siiec_envelope::{HybridDecryptor, HybridEncryptor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let encryptor = HybridEncryptor::from_public_key_pem(&std::fs::read_to_string("public.pem")?)?;
//! let envelope = encryptor.encrypt(r#"{"narrative":"Vi un robo ayer","entities":""}"#)?;
//!
//! let decryptor = HybridDecryptor::from_pkcs8_pem(&std::fs::read_to_string("private.pem")?)?;
//! let body = decryptor.decrypt(&envelope)?;
//! assert_eq!(body["narrative"], "Vi un robo ayer");
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Properties
//!
//! - **Fresh key material**: one AES key and one IV per envelope, straight
//!   from the OS CSPRNG
//! - **Uniform errors**: RSA, base64, IV and tag failures are indistinguishable
//! - **Integrity first**: GCM tag verified before any plaintext is released
//! - **Sanitized output**: markup brackets stripped, fields capped at 10,000 chars
//!
//! ## What's NOT Provided
//!
//! - Binding report metadata as AAD (wire compatibility with existing clients)
//! - Key rotation or key management
//! - Streaming encryption

#![deny(unsafe_code)]

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

mod aead;
mod decryptor;
mod encryptor;
mod envelope;
mod error;
mod keys;
mod provider;
mod report;
mod sanitize;

pub mod wire;

#[cfg(feature = "async")]
pub mod asynchronous;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

pub use aead::{Iv, SessionKey};
pub use decryptor::{HybridDecryptor, PlaintextObject};
pub use encryptor::{validate_plaintext, HybridEncryptor};
pub use envelope::{Envelope, EnvelopeInfo};
pub use error::{
    DecryptError, DecryptionFailed, EncryptError, EnvelopeDefect, FormError, KeyError,
    ValidationError,
};
pub use keys::{escape_pem, generate_keypair, unescape_pem, RecipientPrivateKey, RecipientPublicKey};
pub use provider::{
    KeyOrigin, KeyProvider, KeySources, ENV_PRIVATE_KEY, ENV_PRIVATE_KEY_PATH, ENV_PUBLIC_KEY_PATH,
};
pub use report::{validate_form_fields, AddressDetails, ReportBody, MIN_NARRATIVE_CHARS};
pub use sanitize::{sanitize_object, sanitize_str, sanitize_value};
pub use wire::{ALGORITHM, DEFAULT_MAX_ENVELOPE_BYTES, MAX_FIELD_CHARS, MAX_PLAINTEXT_BYTES};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Encrypt `plaintext` (a JSON object) to `public_key`.
pub fn encrypt(plaintext: &str, public_key: &RecipientPublicKey) -> Result<Envelope, EncryptError> {
    HybridEncryptor::new(public_key.clone()).encrypt(plaintext)
}

/// Decrypt and sanitize `envelope` with `private_key`.
pub fn decrypt(
    envelope: &Envelope,
    private_key: &RecipientPrivateKey,
) -> Result<PlaintextObject, DecryptError> {
    decryptor::decrypt_with(private_key, envelope)
}
