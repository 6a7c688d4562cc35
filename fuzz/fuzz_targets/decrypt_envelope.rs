#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

use siiec_envelope::{wire, Envelope, HybridDecryptor, HybridEncryptor};

static DECRYPTOR: Lazy<HybridDecryptor> = Lazy::new(|| {
    HybridDecryptor::from_pkcs8_pem(include_str!("../../tests/fixtures/recipient_private.pem"))
        .expect("fixture key")
});

static SEED: Lazy<Envelope> = Lazy::new(|| {
    HybridEncryptor::new(DECRYPTOR.public_key())
        .encrypt(r#"{"narrative":"Vi un robo ayer"}"#)
        .expect("seed envelope")
});

// Splice fuzz bytes into one field of a valid envelope so the input reaches
// the AES-GCM and JSON stages, not only the RSA unwrap.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let field = wire::encode(&data[1..]);
    let seed = &*SEED;

    let env = match data[0] % 3 {
        0 => Envelope::from_parts(field, seed.encrypted_key(), seed.iv(), None, None),
        1 => Envelope::from_parts(seed.encrypted_data(), field, seed.iv(), None, None),
        _ => Envelope::from_parts(seed.encrypted_data(), seed.encrypted_key(), field, None, None),
    };

    if let Ok(body) = DECRYPTOR.decrypt(&env) {
        // Only the untouched seed plaintext can verify.
        assert_eq!(body["narrative"], "Vi un robo ayer");
    }
});
