mod common;

use serde_json::json;

use siiec_envelope::wire::{self, MAX_PLAINTEXT_BYTES, NONCE_BYTES, WRAPPED_KEY_BYTES};
use siiec_envelope::{
    decrypt, encrypt, DecryptError, EncryptError, Envelope, EnvelopeDefect, ReportBody,
    ValidationError, ALGORITHM, MAX_FIELD_CHARS,
};

use common::{
    decryptor, encryptor, flip_bit, forge_envelope, other_decryptor, private_key, public_key,
    CountingRng, FailingRng,
};

/// JSON object whose serialized form is exactly `len` bytes.
fn object_of_len(len: usize) -> String {
    let filler = "a".repeat(len - r#"{"n":""}"#.len());
    format!(r#"{{"n":"{}"}}"#, filler)
}

#[test]
fn roundtrip_basic() {
    let env = encryptor()
        .encrypt(r#"{"narrative":"Vi un robo ayer","entities":""}"#)
        .unwrap();
    let body = decryptor().decrypt(&env).unwrap();

    assert_eq!(body["narrative"], "Vi un robo ayer");
    assert_eq!(body["entities"], "");
}

#[test]
fn roundtrip_free_functions() {
    let env = encrypt(r#"{"narrative":"Vi un robo ayer"}"#, &public_key()).unwrap();
    let body = decrypt(&env, &private_key()).unwrap();
    assert_eq!(body["narrative"], "Vi un robo ayer");
}

#[test]
fn roundtrip_sanitizes_nested_fields() {
    let env = encryptor()
        .encrypt_json(&json!({
            "narrative": "  <script>alert(1)</script>  ",
            "entities": "x".repeat(MAX_FIELD_CHARS + 1),
            "addressDetails": { "street": " <b>Av. Juárez</b> 12 ", "zipCode": "06000" },
            "witnesses": 2
        }))
        .unwrap();
    let body = decryptor().decrypt(&env).unwrap();

    assert_eq!(body["narrative"], "scriptalert(1)/script");
    assert_eq!(body["entities"].as_str().unwrap().chars().count(), MAX_FIELD_CHARS);
    assert_eq!(body["addressDetails"]["street"], "bAv. Juárez/b 12");
    assert_eq!(body["witnesses"], 2);
}

#[test]
fn roundtrip_typed_report_body() {
    let report = ReportBody::new("Vi un robo ayer en la esquina de mi casa", "Empresa X");
    report.validate().unwrap();

    let env = encryptor().encrypt_json(&report).unwrap();
    let back = ReportBody::from_plaintext(decryptor().decrypt(&env).unwrap()).unwrap();
    assert_eq!(back, report);
}

#[test]
fn wire_lengths() {
    let env = encryptor().encrypt(r#"{"a":"b"}"#).unwrap();

    assert_eq!(env.algorithm(), ALGORITHM);
    assert_eq!(wire::decode(env.encrypted_key()).unwrap().len(), WRAPPED_KEY_BYTES);
    assert_eq!(wire::decode(env.iv()).unwrap().len(), NONCE_BYTES);
    assert_eq!(wire::decode(env.encrypted_data()).unwrap().len(), 9 + 16);
}

#[test]
fn same_plaintext_twice_differs() {
    let enc = encryptor();
    let a = enc.encrypt(r#"{"narrative":"igual"}"#).unwrap();
    let b = enc.encrypt(r#"{"narrative":"igual"}"#).unwrap();

    assert_ne!(a.iv(), b.iv());
    assert_ne!(a.encrypted_key(), b.encrypted_key());
    assert_ne!(a.encrypted_data(), b.encrypted_data());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn wrong_key_fails() {
    let env = encryptor().encrypt(r#"{"narrative":"secreto"}"#).unwrap();
    assert_eq!(other_decryptor().decrypt(&env), Err(DecryptError::DecryptionFailed));
}

#[test]
fn tampered_data_fails() {
    let env = encryptor().encrypt(r#"{"narrative":"integridad"}"#).unwrap();
    let data_bits = wire::decode(env.encrypted_data()).unwrap().len() * 8;

    for bit in [0, 7, data_bits / 2, data_bits - 1] {
        let tampered = Envelope::from_parts(
            flip_bit(env.encrypted_data(), bit),
            env.encrypted_key(),
            env.iv(),
            Some(ALGORITHM.into()),
            None,
        );
        assert_eq!(
            decryptor().decrypt(&tampered),
            Err(DecryptError::DecryptionFailed),
            "bit {bit}"
        );
    }
}

#[test]
fn tampered_iv_fails() {
    let env = encryptor().encrypt(r#"{"narrative":"integridad"}"#).unwrap();
    let tampered = Envelope::from_parts(
        env.encrypted_data(),
        env.encrypted_key(),
        flip_bit(env.iv(), 42),
        None,
        None,
    );
    assert_eq!(decryptor().decrypt(&tampered), Err(DecryptError::DecryptionFailed));
}

#[test]
fn tampered_wrapped_key_fails() {
    let env = encryptor().encrypt(r#"{"narrative":"integridad"}"#).unwrap();
    let tampered = Envelope::from_parts(
        env.encrypted_data(),
        flip_bit(env.encrypted_key(), 100),
        env.iv(),
        None,
        None,
    );
    assert_eq!(decryptor().decrypt(&tampered), Err(DecryptError::DecryptionFailed));
}

#[test]
fn failures_are_indistinguishable() {
    let env = encryptor().encrypt(r#"{"narrative":"x"}"#).unwrap();
    let wrong_key = other_decryptor().decrypt(&env).unwrap_err();
    let bad_tag = decryptor()
        .decrypt(&Envelope::from_parts(
            flip_bit(env.encrypted_data(), 3),
            env.encrypted_key(),
            env.iv(),
            None,
            None,
        ))
        .unwrap_err();

    assert_eq!(wrong_key, bad_tag);
    assert_eq!(wrong_key.to_string(), bad_tag.to_string());
}

#[test]
fn malformed_envelope_is_distinct() {
    let env = encryptor().encrypt(r#"{"narrative":"x"}"#).unwrap();
    let renamed = Envelope::from_parts(
        env.encrypted_data(),
        env.encrypted_key(),
        env.iv(),
        Some("RSA-OAEP-2048 + AES-256-GCM".into()),
        None,
    );
    let err = decryptor().decrypt(&renamed).unwrap_err();
    assert!(matches!(
        err,
        DecryptError::MalformedEnvelope(EnvelopeDefect::UnsupportedAlgorithm(_))
    ));
    assert_ne!(err.kind(), DecryptError::DecryptionFailed.kind());
}

#[test]
fn malformed_plaintext_after_valid_tag() {
    let pk = public_key();
    let bodies: [&[u8]; 4] = [b"not json", b"[1,2,3]", b"\"texto\"", &[0xff, 0xfe, 0x00]];
    for body in bodies {
        let env = forge_envelope(&pk, body);
        assert_eq!(decryptor().decrypt(&env), Err(DecryptError::MalformedPlaintext));
    }
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

#[test]
fn empty_input_is_rejected_without_randomness() {
    let mut rng = CountingRng::default();
    for input in ["", "   ", "\n\t"] {
        let err = encryptor().encrypt_with_rng(&mut rng, input).unwrap_err();
        assert_eq!(err, EncryptError::Validation(ValidationError::Empty));
    }
    assert_eq!(rng.calls, 0);
}

#[test]
fn size_boundary_exactly_one_mib() {
    let text = object_of_len(MAX_PLAINTEXT_BYTES);
    assert_eq!(text.len(), MAX_PLAINTEXT_BYTES);

    let mut rng = CountingRng::default();
    let env = encryptor().encrypt_with_rng(&mut rng, &text).unwrap();
    assert!(rng.calls > 0);

    let body = decryptor().decrypt(&env).unwrap();
    assert_eq!(body["n"].as_str().unwrap().len(), MAX_FIELD_CHARS);
}

#[test]
fn size_boundary_one_byte_over() {
    let text = object_of_len(MAX_PLAINTEXT_BYTES + 1);

    let mut rng = CountingRng::default();
    let err = encryptor().encrypt_with_rng(&mut rng, &text).unwrap_err();
    assert_eq!(
        err,
        EncryptError::Validation(ValidationError::TooLarge {
            size: MAX_PLAINTEXT_BYTES + 1,
            limit: MAX_PLAINTEXT_BYTES,
        })
    );
    assert_eq!(rng.calls, 0, "no randomness may be drawn for rejected input");
}

#[test]
fn missing_entropy_is_crypto_unavailable() {
    let err = encryptor()
        .encrypt_with_rng(&mut FailingRng, r#"{"narrative":"x"}"#)
        .unwrap_err();
    assert_eq!(err, EncryptError::CryptoUnavailable);
}
