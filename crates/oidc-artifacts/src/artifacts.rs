//! Authorization grants and identity assertions.
//!
//! Both kinds are built by [`codec::sign_claims`]; this module decides which claims
//! they carry and turns decoded claims back into typed values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{self, Claims};
use crate::context::IssuerContext;
use crate::error::{ArtifactError, ArtifactResult};
use crate::pkce::{self, PkceMethod};
use crate::registry::ReplayGuard;

/// Type discriminator carried by authorization grants.
pub const AUTHORIZATION_CODE: &str = "authorization_code";

/// Random bytes in a grant `jti` (128 bits).
const JTI_BYTES: usize = 16;

/// Everything an authorization grant binds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantRequest {
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Claims recovered from a verified authorization grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// The live token request a grant is redeemed against.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenExchange {
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub code_verifier: Option<String>,
}

/// Claims recovered from a verified identity assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub auth_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Issue a signed, self-contained authorization grant.
pub fn issue_authorization_grant(
    ctx: &IssuerContext,
    request: &GrantRequest,
    ttl: i64,
    now: i64,
) -> ArtifactResult<String> {
    if request.code_challenge.is_none() && request.code_challenge_method.is_some() {
        return Err(ArtifactError::invalid_request(
            "code_challenge_method given without code_challenge",
        ));
    }
    if let Some(method) = request.code_challenge_method.as_deref().filter(|m| PkceMethod::parse(m).is_none()) {
        return Err(ArtifactError::invalid_request(format!("unsupported code_challenge_method '{method}'")));
    }

    let mut claims = Claims::new();
    claims.insert("type".into(), Value::from(AUTHORIZATION_CODE));
    claims.insert("client_id".into(), Value::from(request.client_id.as_str()));
    claims.insert("user_id".into(), Value::from(request.user_id.as_str()));
    claims.insert("redirect_uri".into(), Value::from(request.redirect_uri.as_str()));
    claims.insert("scope".into(), Value::from(request.scope.as_str()));
    insert_opt(&mut claims, "code_challenge", request.code_challenge.as_deref());
    insert_opt(&mut claims, "code_challenge_method", request.code_challenge_method.as_deref());
    insert_opt(&mut claims, "nonce", request.nonce.as_deref());
    claims.insert("jti".into(), Value::from(codec::random_b64url(JTI_BYTES)));

    let grant = codec::sign_claims(ctx, claims, ttl, now)?;
    tracing::debug!(client_id = %request.client_id, pkce = request.code_challenge.is_some(), "Issued authorization grant");
    Ok(grant)
}

/// Verify a grant and return its claims.
///
/// Does not check the grant against the live request; see [`exchange_authorization_grant`].
pub fn redeem_authorization_grant(
    ctx: &IssuerContext,
    grant: &str,
    now: i64,
) -> ArtifactResult<GrantClaims> {
    let claims = codec::decode_and_verify(grant, ctx.secret(), now)?;

    let found = claims.get("type").and_then(Value::as_str).unwrap_or("none");
    if found != AUTHORIZATION_CODE {
        return Err(ArtifactError::wrong_type(AUTHORIZATION_CODE, found));
    }

    typed(claims)
}

/// Redeem a grant against the live token request.
///
/// Checks, in order: signature and expiry, type, exact `client_id`, exact
/// `redirect_uri`, PKCE when the grant carries a challenge, and finally single use.
/// A request that fails a binding or PKCE check does not consume the grant.
pub async fn exchange_authorization_grant(
    ctx: &IssuerContext,
    grant: &str,
    exchange: &TokenExchange,
    replay: &ReplayGuard,
    now: i64,
) -> ArtifactResult<GrantClaims> {
    let claims = redeem_authorization_grant(ctx, grant, now)?;

    if claims.client_id != exchange.client_id {
        return Err(ArtifactError::ClientMismatch);
    }
    if claims.redirect_uri != exchange.redirect_uri {
        return Err(ArtifactError::RedirectUriMismatch);
    }

    if let Some(ref challenge) = claims.code_challenge {
        // RFC 7636 §4.3: a challenge committed without a method is "plain".
        let method = claims.code_challenge_method.as_deref().unwrap_or("plain");
        let verified = exchange
            .code_verifier
            .as_deref()
            .is_some_and(|verifier| pkce::verify(verifier, challenge, method));
        if !verified {
            tracing::info!(client_id = %claims.client_id, method, "PKCE verification failed");
            return Err(ArtifactError::PkceFailure);
        }
    }

    replay.consume(&claims.jti, claims.exp).await?;

    tracing::info!(client_id = %claims.client_id, "Redeemed authorization grant");
    Ok(claims)
}

/// Issue a signed identity assertion for `sub`, addressed to `aud`.
pub fn issue_identity_assertion(
    ctx: &IssuerContext,
    sub: &str,
    aud: &str,
    nonce: Option<&str>,
    auth_time: Option<i64>,
    ttl: i64,
    now: i64,
) -> ArtifactResult<String> {
    let mut claims = Claims::new();
    claims.insert("sub".into(), Value::from(sub));
    claims.insert("aud".into(), Value::from(aud));
    claims.insert("auth_time".into(), Value::from(auth_time.unwrap_or(now)));
    insert_opt(&mut claims, "nonce", nonce);

    codec::sign_claims(ctx, claims, ttl, now)
}

/// Verify an identity assertion addressed to `expected_aud`.
pub fn verify_identity_assertion(
    ctx: &IssuerContext,
    assertion: &str,
    expected_aud: &str,
    now: i64,
) -> ArtifactResult<IdentityClaims> {
    let claims = codec::decode_and_verify(assertion, ctx.secret(), now)?;

    // Grants carry a type discriminator; assertions never do.
    if let Some(found) = claims.get("type") {
        return Err(ArtifactError::wrong_type("id_token", found.as_str().unwrap_or("unknown")));
    }

    let identity: IdentityClaims = typed(claims)?;
    if identity.aud != expected_aud {
        return Err(ArtifactError::AudienceMismatch);
    }
    Ok(identity)
}

fn insert_opt(claims: &mut Claims, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        claims.insert(name.to_owned(), Value::from(value));
    }
}

fn typed<T: serde::de::DeserializeOwned>(claims: Claims) -> ArtifactResult<T> {
    serde_json::from_value(Value::Object(claims))
        .map_err(|e| ArtifactError::malformed_claims(e.to_string()))
}
