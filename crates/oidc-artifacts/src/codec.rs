//! Compact signed claims codec (HS256 JWS compact serialization).
//!
//! Wire format: `base64url(header).base64url(claims).base64url(hmac_sha256(header.claims))`,
//! all segments without padding. Every signed artifact in the crate goes through
//! [`encode`] and [`decode_and_verify`]; artifact kinds differ only in the claims they
//! embed.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::context::{IssuerContext, SigningSecret};
use crate::error::{ArtifactError, ArtifactResult};

type HmacSha256 = Hmac<Sha256>;

/// Ordered claim name to value mapping.
pub type Claims = serde_json::Map<String, Value>;

/// Algorithm identifier written into every header.
pub const ALGORITHM: &str = "HS256";

/// Type tag written into every header.
pub const TOKEN_TYPE: &str = "JWT";

/// Claims stamped by [`sign_claims`]; callers cannot override them.
const REGISTERED: [&str; 3] = ["iss", "iat", "exp"];

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Encode and sign a claims set.
pub fn encode(claims: &Claims, secret: &SigningSecret) -> ArtifactResult<String> {
    let header = Header { alg: ALGORITHM.to_string(), typ: TOKEN_TYPE.to_string() };
    let header_json = serde_json::to_vec(&header)
        .map_err(|e| ArtifactError::malformed(format!("header: {e}")))?;
    let claims_json = serde_json::to_vec(claims)
        .map_err(|e| ArtifactError::malformed_claims(e.to_string()))?;

    let signing_input =
        format!("{}.{}", URL_SAFE_NO_PAD.encode(header_json), URL_SAFE_NO_PAD.encode(claims_json));
    let tag = keyed_mac(secret, signing_input.as_bytes())?.finalize().into_bytes();

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(tag)))
}

/// Verify integrity and expiry of an artifact and return its claims.
///
/// The signature is checked before anything else in the artifact is parsed.
/// An `exp` at or before `now` is rejected.
pub fn decode_and_verify(artifact: &str, secret: &SigningSecret, now: i64) -> ArtifactResult<Claims> {
    let segments: Vec<&str> = artifact.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = segments.as_slice() else {
        return Err(ArtifactError::malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| ArtifactError::malformed(format!("signature: {e}")))?;

    let signing_input_len = header_b64.len() + 1 + payload_b64.len();
    keyed_mac(secret, &artifact.as_bytes()[..signing_input_len])?
        .verify_slice(&signature)
        .map_err(|_| ArtifactError::SignatureMismatch)?;

    let header: Header = serde_json::from_slice(&decode_segment(header_b64, "header")?)
        .map_err(|e| ArtifactError::malformed(format!("header: {e}")))?;
    if header.alg != ALGORITHM {
        return Err(ArtifactError::malformed(format!("unsupported alg '{}'", header.alg)));
    }

    let claims: Claims = serde_json::from_slice(&decode_segment(payload_b64, "payload")?)
        .map_err(|e| ArtifactError::malformed_claims(e.to_string()))?;

    if let Some(exp) = claims.get("exp") {
        let exp = exp
            .as_i64()
            .ok_or_else(|| ArtifactError::malformed_claims("exp must be an integer"))?;
        if exp <= now {
            return Err(ArtifactError::Expired { exp, now });
        }
    }

    Ok(claims)
}

/// Stamp `iss`, `iat` and `exp` onto artifact-specific claims and sign the result.
///
/// This is the single issuance path for every artifact kind.
pub fn sign_claims(ctx: &IssuerContext, specific: Claims, ttl: i64, now: i64) -> ArtifactResult<String> {
    if ttl <= 0 {
        return Err(ArtifactError::invalid_request(format!("ttl must be positive, got {ttl}")));
    }

    let mut claims = Claims::new();
    claims.insert("iss".into(), Value::from(ctx.issuer()));
    claims.insert("iat".into(), Value::from(now));
    claims.extend(specific.into_iter().filter(|(k, _)| !REGISTERED.contains(&k.as_str())));
    claims.insert("exp".into(), Value::from(now + ttl));

    encode(&claims, ctx.secret())
}

/// Compute a raw HMAC-SHA256 tag.
pub(crate) fn hmac_tag(secret: &SigningSecret, data: &[u8]) -> ArtifactResult<Vec<u8>> {
    Ok(keyed_mac(secret, data)?.finalize().into_bytes().to_vec())
}

/// Constant-time check of a raw HMAC-SHA256 tag.
pub(crate) fn verify_tag(secret: &SigningSecret, data: &[u8], tag: &[u8]) -> ArtifactResult<()> {
    keyed_mac(secret, data)?.verify_slice(tag).map_err(|_| ArtifactError::SignatureMismatch)
}

/// `len` random bytes, base64url-encoded without padding.
#[must_use]
pub fn random_b64url(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn keyed_mac(secret: &SigningSecret, data: &[u8]) -> ArtifactResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ArtifactError::invalid_request(format!("signing key rejected: {e}")))?;
    mac.update(data);
    Ok(mac)
}

fn decode_segment(segment: &str, what: &str) -> ArtifactResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| ArtifactError::malformed(format!("{what}: {e}")))
}
