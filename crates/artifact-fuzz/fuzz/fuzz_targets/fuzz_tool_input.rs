#![no_main]

use artifact_fuzz::tools::{ExchangeGrantInput, IssueGrantInput, VerifyPkceInput};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Tool arguments arrive as arbitrary JSON from the decision engine
    let _ = serde_json::from_slice::<IssueGrantInput>(data);
    let _ = serde_json::from_slice::<ExchangeGrantInput>(data);
    let _ = serde_json::from_slice::<VerifyPkceInput>(data);
});
