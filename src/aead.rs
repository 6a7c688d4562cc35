//! AEAD: AES-256-GCM with the 16-byte tag appended to the ciphertext.
//!
//! Every session key and IV comes straight from the caller's CSPRNG. Neither
//! type can be cloned, so a value generated for one envelope cannot be reused
//! for another.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::error::{DecryptionFailed, EncryptError};
use crate::wire::{AEAD_TAG_BYTES, AES_KEY_BYTES, NONCE_BYTES};

/// One-time AES-256 key. Zeroized on drop.
pub struct SessionKey(Zeroizing<[u8; AES_KEY_BYTES]>);

impl SessionKey {
    /// Draw 256 fresh bits from `rng`.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<Self, EncryptError> {
        let mut key = Zeroizing::new([0u8; AES_KEY_BYTES]);
        rng.try_fill_bytes(key.as_mut_slice())
            .map_err(|_| EncryptError::CryptoUnavailable)?;
        Ok(Self(key))
    }

    /// Rebuild from unwrapped bytes. Anything but exactly 32 bytes is rejected.
    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, DecryptionFailed> {
        let key: [u8; AES_KEY_BYTES] = bytes.try_into().map_err(|_| DecryptionFailed)?;
        Ok(Self(Zeroizing::new(key)))
    }

    pub fn as_bytes(&self) -> &[u8; AES_KEY_BYTES] {
        &self.0
    }
}

/// 96-bit GCM initialization vector.
pub struct Iv([u8; NONCE_BYTES]);

impl Iv {
    /// Generate a random 12-byte IV. Used during encryption only.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<Self, EncryptError> {
        let mut iv = [0u8; NONCE_BYTES];
        rng.try_fill_bytes(&mut iv)
            .map_err(|_| EncryptError::CryptoUnavailable)?;
        Ok(Self(iv))
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, DecryptionFailed> {
        let iv: [u8; NONCE_BYTES] = bytes.try_into().map_err(|_| DecryptionFailed)?;
        Ok(Self(iv))
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_BYTES] {
        &self.0
    }
}

/// AEAD seal (encrypt path). Output is `ciphertext || tag`.
pub fn seal(
    key: &SessionKey,
    iv: &Iv,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, EncryptError> {
    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| EncryptError::CryptoUnavailable)?;

    let mut buffer = Vec::with_capacity(plaintext.len() + AEAD_TAG_BYTES);
    buffer.extend_from_slice(plaintext);
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(iv.as_bytes()), aad, buffer.as_mut_slice())
        .map_err(|_| EncryptError::CryptoUnavailable)?;
    buffer.extend_from_slice(&tag);
    Ok(buffer)
}

/// AEAD open (decrypt path). Splits the trailing tag off `data` and verifies
/// it before any plaintext is released.
pub fn open(
    key: &SessionKey,
    iv: &Iv,
    data: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, DecryptionFailed> {
    if data.len() < AEAD_TAG_BYTES {
        return Err(DecryptionFailed);
    }
    let (ciphertext, tag) = data.split_at(data.len() - AEAD_TAG_BYTES);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| DecryptionFailed)?;
    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(iv.as_bytes()),
            aad,
            buffer.as_mut_slice(),
            Tag::from_slice(tag),
        )
        .map_err(|_| DecryptionFailed)?;
    Ok(buffer)
}
