//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements `plain` and `S256` code challenge verification per RFC 7636, plus
//! verifier/challenge generation for the relying-party side of the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::codec::random_b64url;

/// Challenge methods this verifier recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkceMethod {
    /// `challenge == verifier`
    Plain,
    /// `challenge == BASE64URL(SHA256(verifier))`
    S256,
}

impl PkceMethod {
    /// Parse a `code_challenge_method` value. Matching is exact.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "plain" => Some(Self::Plain),
            "S256" => Some(Self::S256),
            _ => None,
        }
    }

    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }
}

/// Verify a code verifier against a committed challenge.
///
/// Unrecognized methods always fail.
#[must_use]
pub fn verify(code_verifier: &str, code_challenge: &str, method: &str) -> bool {
    match PkceMethod::parse(method) {
        Some(PkceMethod::Plain) => constant_time_eq(code_verifier, code_challenge),
        Some(PkceMethod::S256) => verify_s256(code_verifier, code_challenge),
        None => false,
    }
}

/// Verify a PKCE S256 code challenge.
///
/// Computes `BASE64URL(SHA256(code_verifier))` and compares to the stored challenge.
#[must_use]
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    constant_time_eq(&s256_challenge(code_verifier), code_challenge)
}

/// Derive the S256 challenge for a verifier.
#[must_use]
pub fn s256_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

/// A verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// 43-character base64url verifier from 32 random bytes.
    pub verifier: String,
    /// S256 challenge of [`Self::verifier`].
    pub challenge: String,
    /// Always [`PkceMethod::S256`].
    pub method: PkceMethod,
}

/// Generate a fresh S256 verifier/challenge pair.
#[must_use]
pub fn generate() -> PkcePair {
    let verifier = random_b64url(32);
    let challenge = s256_challenge(&verifier);
    PkcePair { verifier, challenge, method: PkceMethod::S256 }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
