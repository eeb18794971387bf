#![no_main]

use artifact_fuzz::{FUZZ_NOW, FUZZ_SECRET, SigningSecret, codec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(secret) = SigningSecret::new(FUZZ_SECRET) else {
        return;
    };
    let _ = codec::decode_and_verify(token, &secret, FUZZ_NOW);
});
