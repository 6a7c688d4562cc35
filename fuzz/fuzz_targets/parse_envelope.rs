#![no_main]

use libfuzzer_sys::fuzz_target;
use siiec_envelope::{Envelope, DEFAULT_MAX_ENVELOPE_BYTES};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(env) = Envelope::from_json(text, DEFAULT_MAX_ENVELOPE_BYTES) {
        let _ = env.validate_shape();
        let _ = env.inspect().map(|info| info.to_string());
        let _ = env.check_size(DEFAULT_MAX_ENVELOPE_BYTES);
    }
});
