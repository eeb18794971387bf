//! Tool dispatch tests.
//!
//! Drives the full authorization code flow through the named tool surface, the way
//! the decision engine calls it.

use serde_json::{Value, json};

use oidc_artifacts::codec;
use oidc_artifacts::config::Config;
use oidc_artifacts::error::ToolError;
use oidc_artifacts::pkce;
use oidc_artifacts::tools::{self, ArtifactTool, ToolContext};

const NOW: i64 = 1_700_000_000;
const ISSUER: &str = "https://op.example.com";

fn setup() -> (Vec<Box<dyn ArtifactTool>>, ToolContext) {
    let config = Config::for_testing(ISSUER);
    let ctx = ToolContext::from_config(&config).unwrap().with_fixed_clock(NOW);
    (tools::register_all_tools(), ctx)
}

async fn call(tools: &[Box<dyn ArtifactTool>], ctx: &ToolContext, name: &str, args: Value) -> Value {
    tools::dispatch(tools, ctx, name, args).await.unwrap()
}

#[tokio::test]
async fn test_full_code_flow() {
    let (tools, ctx) = setup();
    let challenge = pkce::s256_challenge("verifierXYZ");

    let issued = call(&tools, &ctx, "issue_authorization_grant", json!({
        "client_id": "c1",
        "user_id": "alice",
        "redirect_uri": "https://rp/cb",
        "code_challenge": challenge,
        "code_challenge_method": "S256",
        "nonce": "abc"
    }))
    .await;
    assert_eq!(issued["ok"], true);
    assert_eq!(issued["expires_in"], 600);
    let code = issued["code"].as_str().unwrap().to_string();

    let exchanged = call(&tools, &ctx, "exchange_authorization_grant", json!({
        "code": code,
        "client_id": "c1",
        "redirect_uri": "https://rp/cb",
        "code_verifier": "verifierXYZ"
    }))
    .await;
    assert_eq!(exchanged["ok"], true);
    assert_eq!(exchanged["user_id"], "alice");
    assert_eq!(exchanged["scope"], "openid");
    assert_eq!(exchanged["iss"], ISSUER);

    let tokens = call(&tools, &ctx, "issue_tokens", json!({
        "client_id": "c1", "user_id": "alice", "scope": "openid"
    }))
    .await;
    assert_eq!(tokens["token_type"], "Bearer");

    let info = call(&tools, &ctx, "validate_access_token", json!({
        "token": tokens["access_token"]
    }))
    .await;
    assert_eq!(info["ok"], true);
    assert_eq!(info["client_id"], "c1");

    let assertion = call(&tools, &ctx, "issue_identity_assertion", json!({
        "sub": "alice", "aud": "c1", "nonce": "abc"
    }))
    .await;
    let id_token = assertion["id_token"].as_str().unwrap();

    let claims = codec::decode_and_verify(id_token, ctx.issuer.secret(), NOW).unwrap();
    assert_eq!(claims["iss"], ISSUER);
    assert_eq!(claims["sub"], "alice");
    assert_eq!(claims["aud"], "c1");
    assert_eq!(claims["nonce"], "abc");
    assert_eq!(claims["iat"], NOW);
    assert_eq!(claims["auth_time"], NOW);

    let verified = call(&tools, &ctx, "verify_identity_assertion", json!({
        "id_token": id_token, "aud": "c1"
    }))
    .await;
    assert_eq!(verified["ok"], true);

    let replayed = call(&tools, &ctx, "exchange_authorization_grant", json!({
        "code": code,
        "client_id": "c1",
        "redirect_uri": "https://rp/cb",
        "code_verifier": "verifierXYZ"
    }))
    .await;
    assert_eq!(replayed["ok"], false);
    assert_eq!(replayed["error"], "grant_replayed");
    assert_eq!(replayed["oauth_error"], "invalid_grant");
}

#[tokio::test]
async fn test_refresh_and_revoke_tools() {
    let (tools, ctx) = setup();
    let tokens = call(&tools, &ctx, "issue_tokens", json!({
        "client_id": "c1", "user_id": "alice", "scope": "openid"
    }))
    .await;

    let wrong_client = call(&tools, &ctx, "refresh_tokens", json!({
        "refresh_token": tokens["refresh_token"], "client_id": "c2"
    }))
    .await;
    assert_eq!(wrong_client["error"], "client_mismatch");

    // The mismatched attempt burned the refresh token.
    let retried = call(&tools, &ctx, "refresh_tokens", json!({
        "refresh_token": tokens["refresh_token"], "client_id": "c1"
    }))
    .await;
    assert_eq!(retried["error"], "not_found");

    let fresh = call(&tools, &ctx, "issue_tokens", json!({
        "client_id": "c1", "user_id": "alice", "scope": "openid"
    }))
    .await;
    let revoked = call(&tools, &ctx, "revoke_token", json!({ "token": fresh["refresh_token"] })).await;
    assert_eq!(revoked["revoked"], true);

    let gone = call(&tools, &ctx, "validate_access_token", json!({ "token": fresh["access_token"] })).await;
    assert_eq!(gone["ok"], false);
    assert_eq!(gone["oauth_error"], "invalid_token");
}

#[tokio::test]
async fn test_expired_grant_under_fixed_clock() {
    let (tools, ctx) = setup();
    let issued = call(&tools, &ctx, "issue_authorization_grant", json!({
        "client_id": "c1", "user_id": "alice", "redirect_uri": "https://rp/cb"
    }))
    .await;

    let later = ctx.clone().with_fixed_clock(NOW + 600);
    let redeemed = call(&tools, &later, "redeem_authorization_grant", json!({ "code": issued["code"] })).await;
    assert_eq!(redeemed["ok"], false);
    assert_eq!(redeemed["error"], "expired");

    let before = call(&tools, &ctx, "redeem_authorization_grant", json!({ "code": issued["code"] })).await;
    assert_eq!(before["ok"], true);
    assert_eq!(before["code_challenge_method"], Value::Null);
}

#[tokio::test]
async fn test_verify_pkce_tool() {
    let (tools, ctx) = setup();
    let challenge = pkce::s256_challenge("v");

    let ok = call(&tools, &ctx, "verify_pkce", json!({
        "code_verifier": "v", "code_challenge": challenge, "code_challenge_method": "S256"
    }))
    .await;
    assert_eq!(ok["verified"], true);

    let unknown = call(&tools, &ctx, "verify_pkce", json!({
        "code_verifier": "v", "code_challenge": "v", "code_challenge_method": "S512"
    }))
    .await;
    assert_eq!(unknown["verified"], false);
}

#[tokio::test]
async fn test_unknown_tool_fails_closed() {
    let (tools, ctx) = setup();
    let result = tools::dispatch(&tools, &ctx, "mint_anything", json!({})).await;
    assert!(matches!(result, Err(ToolError::UnknownTool(name)) if name == "mint_anything"));
}

#[tokio::test]
async fn test_unknown_argument_rejected() {
    let (tools, ctx) = setup();
    let result = tools::dispatch(&tools, &ctx, "issue_tokens", json!({
        "client_id": "c1", "user_id": "alice", "scope": "openid", "admin": true
    }))
    .await;
    assert!(matches!(result, Err(ToolError::Serialization(_))));
}

#[tokio::test]
async fn test_empty_required_argument_rejected() {
    let (tools, ctx) = setup();
    let result = tools::dispatch(&tools, &ctx, "redeem_authorization_grant", json!({ "code": "  " })).await;
    assert!(matches!(result, Err(ToolError::Validation { .. })));
}
