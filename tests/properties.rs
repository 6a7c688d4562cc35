mod common;

use proptest::prelude::*;
use serde_json::{Map, Value};

use siiec_envelope::{sanitize_object, sanitize_str, sanitize_value, DecryptError, Envelope, MAX_FIELD_CHARS};

use common::{decryptor, encryptor, flip_bit};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        ".{0,64}".prop_map(Value::String),
        "[ <>a-zñ]{0,32}".prop_map(Value::String),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-zA-Z]{1,12}", value(), 1..6).prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(s in ".{0,256}") {
        let once = sanitize_str(&s);
        prop_assert_eq!(sanitize_str(&once), once.clone());
        prop_assert!(!once.contains('<') && !once.contains('>'));
        prop_assert!(once.chars().count() <= MAX_FIELD_CHARS);
    }

    #[test]
    fn sanitize_value_is_idempotent(v in value()) {
        let once = sanitize_value(v);
        prop_assert_eq!(sanitize_value(once.clone()), once);
    }
}

proptest! {
    // RSA-4096 per case; keep the count small.
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn roundtrip_equals_sanitized_input(obj in object()) {
        let text = serde_json::to_string(&obj).unwrap();
        let env = encryptor().encrypt(&text).unwrap();
        let body = decryptor().decrypt(&env).unwrap();
        prop_assert_eq!(body, sanitize_object(obj));
    }

    #[test]
    fn any_flipped_data_bit_is_detected(bit in 0usize..(24 * 8)) {
        let env = encryptor().encrypt(r#"{"narrative":"Vi un robo"}"#).unwrap();
        let tampered = Envelope::from_parts(
            flip_bit(env.encrypted_data(), bit),
            env.encrypted_key(),
            env.iv(),
            None,
            None,
        );
        prop_assert_eq!(decryptor().decrypt(&tampered), Err(DecryptError::DecryptionFailed));
    }

    #[test]
    fn any_flipped_iv_bit_is_detected(bit in 0usize..96) {
        let env = encryptor().encrypt(r#"{"narrative":"Vi un robo"}"#).unwrap();
        let tampered = Envelope::from_parts(
            env.encrypted_data(),
            env.encrypted_key(),
            flip_bit(env.iv(), bit),
            None,
            None,
        );
        prop_assert_eq!(decryptor().decrypt(&tampered), Err(DecryptError::DecryptionFailed));
    }
}
