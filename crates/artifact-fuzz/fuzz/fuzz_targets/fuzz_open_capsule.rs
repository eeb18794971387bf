#![no_main]

use artifact_fuzz::{FUZZ_NOW, FUZZ_SECRET, SigningSecret, capsule};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(sealed) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(secret) = SigningSecret::new(FUZZ_SECRET) else {
        return;
    };
    let _ = capsule::open::<serde_json::Value>(sealed, &secret);
    let _ = capsule::open_flow_state(sealed, &secret, 600, FUZZ_NOW);
});
