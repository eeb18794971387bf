//! Fuzzing library for oidc-artifacts.
//!
//! The targets feed arbitrary bytes to every decoder that accepts attacker-supplied
//! input: compact tokens, session capsules and tool arguments. None may panic.
//!
//! # Usage
//!
//! ```bash
//! cd crates/artifact-fuzz
//! cargo +nightly fuzz run fuzz_decode_token -- -max_total_time=60
//! ```

pub use oidc_artifacts::{SigningSecret, capsule, codec, tools};

/// Fixed secret shared by the targets.
pub const FUZZ_SECRET: &[u8] = b"fuzz-signing-secret-0123456789abcdef";

/// Timestamp the decoders are evaluated at.
pub const FUZZ_NOW: i64 = 1_700_000_000;
