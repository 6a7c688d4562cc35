//! Client-side half of the pipeline: plaintext JSON in, [`Envelope`] out.
//!
//! Needs only the recipient public key. Each call draws a fresh AES-256 key
//! and a fresh IV; nothing is cached between calls.

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use rand_core::{CryptoRngCore, OsRng};
use serde::de::IgnoredAny;
use serde::Serialize;

use crate::aead::{self, Iv, SessionKey};
use crate::envelope::Envelope;
use crate::error::{EncryptError, KeyError, ValidationError};
use crate::keys::RecipientPublicKey;
use crate::wire::{self, MAX_PLAINTEXT_BYTES};

/// Input checks that run before any randomness is drawn.
pub fn validate_plaintext(plaintext: &str) -> Result<(), ValidationError> {
    if plaintext.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    if plaintext.len() > MAX_PLAINTEXT_BYTES {
        return Err(ValidationError::TooLarge {
            size: plaintext.len(),
            limit: MAX_PLAINTEXT_BYTES,
        });
    }
    serde_json::from_str::<HashMap<String, IgnoredAny>>(plaintext)
        .map_err(|e| ValidationError::NotJson(e.to_string()))?;
    Ok(())
}

/// Hybrid encryptor bound to one recipient public key.
#[derive(Clone, Debug)]
pub struct HybridEncryptor {
    public_key: RecipientPublicKey,
}

impl HybridEncryptor {
    pub fn new(public_key: RecipientPublicKey) -> Self {
        Self { public_key }
    }

    pub fn from_public_key_pem(pem: &str) -> Result<Self, KeyError> {
        RecipientPublicKey::from_public_key_pem(pem).map(Self::new)
    }

    pub fn public_key(&self) -> &RecipientPublicKey {
        &self.public_key
    }

    /// Encrypt a JSON object using the operating system CSPRNG.
    pub fn encrypt(&self, plaintext: &str) -> Result<Envelope, EncryptError> {
        self.encrypt_with_rng(&mut OsRng, plaintext)
    }

    /// Encrypt with an explicit CSPRNG.
    ///
    /// Validation happens first: an empty, oversized or non-object plaintext
    /// is rejected without touching `rng`.
    pub fn encrypt_with_rng<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        plaintext: &str,
    ) -> Result<Envelope, EncryptError> {
        validate_plaintext(plaintext)?;

        let key = SessionKey::generate(rng)?;
        let iv = Iv::generate(rng)?;
        let sealed = aead::seal(&key, &iv, plaintext.as_bytes(), &[])?;
        let wrapped = self.public_key.wrap_session_key(rng, &key)?;

        tracing::trace!(
            plaintext_bytes = plaintext.len(),
            ciphertext_bytes = sealed.len(),
            "sealed envelope"
        );

        Ok(Envelope::sealed(
            wire::encode(&sealed),
            wire::encode(&wrapped),
            wire::encode(iv.as_bytes()),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        ))
    }

    /// Serialize `value` to JSON and encrypt it.
    pub fn encrypt_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<Envelope, EncryptError> {
        let text = serde_json::to_string(value).map_err(|e| ValidationError::NotJson(e.to_string()))?;
        self.encrypt(&text)
    }
}
