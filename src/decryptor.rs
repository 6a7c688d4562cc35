//! Server-side half of the pipeline: [`Envelope`] in, sanitized JSON object out.

use core::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::aead::{self, Iv};
use crate::envelope::Envelope;
use crate::error::{DecryptError, KeyError};
use crate::keys::{RecipientPrivateKey, RecipientPublicKey};
use crate::sanitize::sanitize_object;
use crate::wire;

/// Decrypted and sanitized report body.
pub type PlaintextObject = Map<String, Value>;

/// Shape check, key unwrap, tag-verified open, JSON parse, sanitize.
pub(crate) fn decrypt_with(
    private_key: &RecipientPrivateKey,
    envelope: &Envelope,
) -> Result<PlaintextObject, DecryptError> {
    envelope.validate_shape()?;

    let wrapped = wire::decode(envelope.encrypted_key())?;
    let key = private_key.unwrap_session_key(&wrapped)?;
    let iv = Iv::from_slice(&wire::decode(envelope.iv())?)?;
    let data = wire::decode(envelope.encrypted_data())?;
    let plaintext = aead::open(&key, &iv, &data, &[])?;

    match serde_json::from_slice::<Value>(&plaintext) {
        Ok(Value::Object(map)) => Ok(sanitize_object(map)),
        _ => Err(DecryptError::MalformedPlaintext),
    }
}

/// Hybrid decryptor sharing one immutable private key.
///
/// Cloning is cheap; every clone reads the same key without locking.
#[derive(Clone)]
pub struct HybridDecryptor {
    private_key: Arc<RecipientPrivateKey>,
}

impl fmt::Debug for HybridDecryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridDecryptor").finish_non_exhaustive()
    }
}

impl From<RecipientPrivateKey> for HybridDecryptor {
    fn from(key: RecipientPrivateKey) -> Self {
        Self::new(Arc::new(key))
    }
}

impl HybridDecryptor {
    pub fn new(private_key: Arc<RecipientPrivateKey>) -> Self {
        Self { private_key }
    }

    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, KeyError> {
        RecipientPrivateKey::from_pkcs8_pem(pem).map(Self::from)
    }

    pub fn public_key(&self) -> RecipientPublicKey {
        self.private_key.public_key()
    }

    /// Recover and sanitize the plaintext object.
    ///
    /// Shape problems are reported as [`DecryptError::MalformedEnvelope`].
    /// Every cryptographic failure, whichever step it came from, is
    /// [`DecryptError::DecryptionFailed`]. No partially decrypted bytes are
    /// ever returned.
    pub fn decrypt(&self, envelope: &Envelope) -> Result<PlaintextObject, DecryptError> {
        decrypt_with(&self.private_key, envelope)
    }

    /// [`decrypt`](Self::decrypt) preceded by the envelope size ceiling.
    pub fn decrypt_bounded(
        &self,
        envelope: &Envelope,
        max_envelope_bytes: usize,
    ) -> Result<PlaintextObject, DecryptError> {
        envelope.check_size(max_envelope_bytes)?;
        self.decrypt(envelope)
    }
}
