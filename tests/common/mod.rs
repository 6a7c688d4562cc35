//! Shared fixtures for integration tests.
#![allow(dead_code)]

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand_core::{CryptoRng, OsRng, RngCore};

use siiec_envelope::{
    wire, Envelope, HybridDecryptor, HybridEncryptor, RecipientPrivateKey, RecipientPublicKey, SessionKey,
};

pub const PUBLIC_PEM: &str = include_str!("../fixtures/recipient_public.pem");
pub const PRIVATE_PEM: &str = include_str!("../fixtures/recipient_private.pem");
pub const OTHER_PUBLIC_PEM: &str = include_str!("../fixtures/other_public.pem");
pub const OTHER_PRIVATE_PEM: &str = include_str!("../fixtures/other_private.pem");
pub const UNDERSIZED_PUBLIC_PEM: &str = include_str!("../fixtures/undersized_public.pem");
pub const KAT_ENVELOPE: &str = include_str!("../fixtures/kat_envelope.json");

pub fn public_key() -> RecipientPublicKey {
    RecipientPublicKey::from_public_key_pem(PUBLIC_PEM).unwrap()
}

pub fn private_key() -> RecipientPrivateKey {
    RecipientPrivateKey::from_pkcs8_pem(PRIVATE_PEM).unwrap()
}

pub fn encryptor() -> HybridEncryptor {
    HybridEncryptor::new(public_key())
}

pub fn decryptor() -> HybridDecryptor {
    HybridDecryptor::from(private_key())
}

pub fn other_decryptor() -> HybridDecryptor {
    HybridDecryptor::from_pkcs8_pem(OTHER_PRIVATE_PEM).unwrap()
}

/// Build an envelope around arbitrary plaintext bytes, bypassing the
/// encryptor's input validation.
pub fn forge_envelope(pk: &RecipientPublicKey, plaintext: &[u8]) -> Envelope {
    let key = SessionKey::generate(&mut OsRng).unwrap();
    let mut iv = [0u8; wire::NONCE_BYTES];
    OsRng.fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).unwrap();
    let sealed = cipher.encrypt(Nonce::from_slice(&iv), plaintext).unwrap();
    let wrapped = pk.wrap_session_key(&mut OsRng, &key).unwrap();

    Envelope::from_parts(
        wire::encode(&sealed),
        wire::encode(&wrapped),
        wire::encode(&iv),
        Some(wire::ALGORITHM.to_owned()),
        None,
    )
}

/// Flip one bit of a base64 field's decoded bytes.
pub fn flip_bit(field: &str, bit: usize) -> String {
    let mut bytes = wire::decode(field).unwrap();
    let len = bytes.len();
    bytes[(bit / 8) % len] ^= 1 << (bit % 8);
    wire::encode(&bytes)
}

/// OS-backed RNG that counts how often it is asked for randomness.
#[derive(Default)]
pub struct CountingRng {
    pub calls: usize,
}

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        self.calls += 1;
        OsRng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.calls += 1;
        OsRng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.calls += 1;
        OsRng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.calls += 1;
        OsRng.try_fill_bytes(dest)
    }
}

impl CryptoRng for CountingRng {}

/// RNG standing in for a host without a working entropy source.
pub struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        panic!("entropy source unavailable")
    }

    fn next_u64(&mut self) -> u64 {
        panic!("entropy source unavailable")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        panic!("entropy source unavailable")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
        Err(rand_core::Error::new("entropy source unavailable"))
    }
}

impl CryptoRng for FailingRng {}
