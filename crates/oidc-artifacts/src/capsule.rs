//! Session capsules: tamper-evident flow state carried by the relying party.
//!
//! Format is `base64url(json).base64url(hmac_sha256(base64url(json)))`. There is no
//! header and no built-in expiry; freshness comes from the cookie `Max-Age` and the
//! `created_at` checked by [`open_flow_state`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{hmac_tag, random_b64url, verify_tag};
use crate::context::SigningSecret;
use crate::error::{ArtifactError, ArtifactResult};
use crate::pkce;

/// Seal a payload into a capsule string.
pub fn seal<T: Serialize>(payload: &T, secret: &SigningSecret) -> ArtifactResult<String> {
    let json = serde_json::to_vec(payload).map_err(|e| ArtifactError::malformed_claims(e.to_string()))?;
    let encoded = URL_SAFE_NO_PAD.encode(json);
    let tag = hmac_tag(secret, encoded.as_bytes())?;
    Ok(format!("{encoded}.{}", URL_SAFE_NO_PAD.encode(tag)))
}

/// Verify and decode a capsule.
pub fn open<T: DeserializeOwned>(capsule: &str, secret: &SigningSecret) -> ArtifactResult<T> {
    let Some((encoded, tag_b64)) = capsule.split_once('.') else {
        return Err(ArtifactError::malformed("expected 2 segments, found 1"));
    };
    if tag_b64.contains('.') {
        return Err(ArtifactError::malformed("expected 2 segments, found more"));
    }

    let tag = URL_SAFE_NO_PAD
        .decode(tag_b64)
        .map_err(|e| ArtifactError::malformed(format!("tag: {e}")))?;
    verify_tag(secret, encoded.as_bytes(), &tag)?;

    let json = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| ArtifactError::malformed(format!("payload: {e}")))?;
    serde_json::from_slice(&json).map_err(|e| ArtifactError::malformed_claims(e.to_string()))
}

/// Transient state the relying party keeps across the authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct FlowState {
    pub state: String,
    /// PKCE code verifier.
    pub verifier: String,
    pub nonce: String,
    pub redirect_uri: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl FlowState {
    /// Start a flow: fresh `state`, `nonce` and PKCE verifier.
    ///
    /// Returns the state together with the S256 challenge to send to the provider.
    #[must_use]
    pub fn begin(redirect_uri: impl Into<String>, now: i64) -> (Self, String) {
        let pair = pkce::generate();
        let flow = Self {
            state: random_b64url(16),
            verifier: pair.verifier,
            nonce: random_b64url(16),
            redirect_uri: redirect_uri.into(),
            created_at: now,
        };
        (flow, pair.challenge)
    }

    /// Not from the future and not older than `max_age` seconds.
    #[must_use]
    pub const fn is_fresh(&self, max_age: i64, now: i64) -> bool {
        self.created_at <= now && now - self.created_at <= max_age
    }
}

/// Open a flow-state capsule and enforce its embedded age.
pub fn open_flow_state(
    capsule: &str,
    secret: &SigningSecret,
    max_age: i64,
    now: i64,
) -> ArtifactResult<FlowState> {
    let flow: FlowState = open(capsule, secret)?;
    if !flow.is_fresh(max_age, now) {
        return Err(ArtifactError::Expired { exp: flow.created_at + max_age, now });
    }
    Ok(flow)
}

/// `Set-Cookie` value carrying a capsule.
#[must_use]
pub fn flow_cookie(name: &str, capsule: &str, max_age: i64) -> String {
    format!("{name}={capsule}; Max-Age={max_age}; Path=/; HttpOnly; Secure; SameSite=Lax")
}
