//! Known-answer and interoperability tests.
//!
//! `kat_envelope.json` was produced by an independent RSA-OAEP(SHA-256,
//! MGF1-SHA-256) + AES-256-GCM implementation against the fixture key pair.

mod common;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;

use siiec_envelope::wire::{self, AEAD_TAG_BYTES, AES_KEY_BYTES, DEFAULT_MAX_ENVELOPE_BYTES, NONCE_BYTES, WRAPPED_KEY_BYTES};
use siiec_envelope::{Envelope, HybridEncryptor, KeyError, ReportBody, ALGORITHM};

use common::{decryptor, encryptor, KAT_ENVELOPE, PRIVATE_PEM, UNDERSIZED_PUBLIC_PEM};

#[test]
fn test_wire_constants() {
    assert_eq!(ALGORITHM, "RSA-OAEP-4096 + AES-256-GCM");
    assert_eq!(WRAPPED_KEY_BYTES, 512);
    assert_eq!(AES_KEY_BYTES, 32);
    assert_eq!(NONCE_BYTES, 12);
    assert_eq!(AEAD_TAG_BYTES, 16);
}

#[test]
fn test_kat_decrypts_and_sanitizes() {
    let env = Envelope::from_json(KAT_ENVELOPE, DEFAULT_MAX_ENVELOPE_BYTES).unwrap();
    assert_eq!(env.timestamp(), "2025-11-03T17:42:09.512Z");

    let body = decryptor().decrypt(&env).unwrap();
    assert_eq!(body["narrative"], "Vi un robo ayer en la esquina");
    assert_eq!(body["entities"], "Empresa X");
    assert_eq!(body["addressDetails"]["street"], "Av. Juárez 12");
    assert_eq!(body["addressDetails"]["colony"], "Centro");
    assert_eq!(body["addressDetails"]["zipCode"], "06000");
    assert_eq!(body["addressDetails"]["references"], "frente al parque");

    let report = ReportBody::from_plaintext(body).unwrap();
    assert_eq!(report.address_details.unwrap().zip_code, "06000");
}

#[test]
fn test_kat_inspect() {
    let env = Envelope::from_json(KAT_ENVELOPE, DEFAULT_MAX_ENVELOPE_BYTES).unwrap();
    let info = env.inspect().unwrap();
    assert_eq!(info.algorithm, ALGORITHM);
    assert_eq!(info.plaintext_bytes, Some(205));
    assert!(info.key_matches_modulus);
    assert!(info.iv_is_standard);
}

/// Open one of our envelopes with the primitives alone: OAEP-SHA256 unwrap,
/// then AES-GCM with the tag at the end of `encryptedData`.
#[test]
fn test_envelope_opens_with_raw_primitives() {
    let plaintext = r#"{"narrative":"Vi un robo ayer","entities":""}"#;
    let env = encryptor().encrypt(plaintext).unwrap();

    let sk = RsaPrivateKey::from_pkcs8_pem(PRIVATE_PEM).unwrap();
    let aes_key = sk
        .decrypt(Oaep::new::<Sha256>(), &wire::decode(env.encrypted_key()).unwrap())
        .unwrap();
    assert_eq!(aes_key.len(), AES_KEY_BYTES);

    let iv = wire::decode(env.iv()).unwrap();
    let cipher = Aes256Gcm::new_from_slice(&aes_key).unwrap();
    let recovered = cipher
        .decrypt(Nonce::from_slice(&iv), wire::decode(env.encrypted_data()).unwrap().as_slice())
        .unwrap();
    assert_eq!(recovered, plaintext.as_bytes());
}

#[test]
fn test_end_to_end_scenario() {
    let env = encryptor()
        .encrypt(r#"{"narrative":"Vi un robo ayer","entities":""}"#)
        .unwrap();
    let wire_json = serde_json::to_string(&env).unwrap();

    let received = Envelope::from_json(&wire_json, DEFAULT_MAX_ENVELOPE_BYTES).unwrap();
    let body = decryptor().decrypt(&received).unwrap();
    assert_eq!(body["narrative"], "Vi un robo ayer");
}

#[test]
fn test_undersized_public_key_is_refused() {
    let err = HybridEncryptor::from_public_key_pem(UNDERSIZED_PUBLIC_PEM).unwrap_err();
    assert!(matches!(err, KeyError::UnsupportedModulus { bits: 2048, .. }));
}
