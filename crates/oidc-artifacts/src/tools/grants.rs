//! Grant tools: issue_authorization_grant, redeem_authorization_grant,
//! exchange_authorization_grant, verify_pkce.

use serde::Deserialize;
use serde_json::{Value, json};

use super::{ArtifactTool, ToolContext, outcome, parse_input, require};
use crate::artifacts::{self, GrantRequest, TokenExchange};
use crate::error::ToolResult;
use crate::pkce;

/// Input for issuing an authorization grant.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueGrantInput {
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub code_challenge: Option<String>,
    #[serde(default)]
    pub code_challenge_method: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

fn default_scope() -> String {
    "openid".to_string()
}

/// Input for verifying a grant without cross-checking a request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedeemGrantInput {
    pub code: String,
}

/// Input for the full token-endpoint redemption.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeGrantInput {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub code_verifier: Option<String>,
}

/// Input for a standalone PKCE check.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyPkceInput {
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
}

/// Authorization grant issuance tool.
pub struct IssueAuthorizationGrantTool;

#[async_trait::async_trait]
impl ArtifactTool for IssueAuthorizationGrantTool {
    fn name(&self) -> &'static str {
        "issue_authorization_grant"
    }

    fn description(&self) -> &'static str {
        "Issue a signed, single-use authorization code bound to a client, redirect URI and optional PKCE challenge."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "client_id": {"type": "string"},
                "user_id": {"type": "string", "description": "Authenticated end user"},
                "redirect_uri": {"type": "string", "description": "Exact redirect URI from the request"},
                "scope": {"type": "string", "default": "openid"},
                "code_challenge": {"type": "string"},
                "code_challenge_method": {"type": "string", "enum": ["plain", "S256"]},
                "nonce": {"type": "string"}
            },
            "required": ["client_id", "user_id", "redirect_uri"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: IssueGrantInput = parse_input(input)?;
        require("client_id", &params.client_id)?;
        require("user_id", &params.user_id)?;
        require("redirect_uri", &params.redirect_uri)?;

        let request = GrantRequest {
            client_id: params.client_id,
            user_id: params.user_id,
            redirect_uri: params.redirect_uri,
            scope: params.scope,
            code_challenge: params.code_challenge,
            code_challenge_method: params.code_challenge_method,
            nonce: params.nonce,
        };

        let grant = artifacts::issue_authorization_grant(&ctx.issuer, &request, ctx.grant_ttl, ctx.now());
        outcome(grant.map(|code| json!({ "code": code, "expires_in": ctx.grant_ttl })))
    }
}

/// Grant verification tool (signature, expiry, type only).
pub struct RedeemAuthorizationGrantTool;

#[async_trait::async_trait]
impl ArtifactTool for RedeemAuthorizationGrantTool {
    fn name(&self) -> &'static str {
        "redeem_authorization_grant"
    }

    fn description(&self) -> &'static str {
        "Verify an authorization code's signature, expiry and type and return its claims. Does not consume it."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {"type": "string"}
            },
            "required": ["code"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: RedeemGrantInput = parse_input(input)?;
        require("code", &params.code)?;

        outcome(artifacts::redeem_authorization_grant(&ctx.issuer, &params.code, ctx.now()))
    }
}

/// Full authorization code redemption tool.
pub struct ExchangeAuthorizationGrantTool;

#[async_trait::async_trait]
impl ArtifactTool for ExchangeAuthorizationGrantTool {
    fn name(&self) -> &'static str {
        "exchange_authorization_grant"
    }

    fn description(&self) -> &'static str {
        "Redeem an authorization code for a token request: exact client_id and redirect_uri match, mandatory PKCE when a challenge was committed, single use."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {"type": "string"},
                "client_id": {"type": "string"},
                "redirect_uri": {"type": "string"},
                "code_verifier": {"type": "string"}
            },
            "required": ["code", "client_id", "redirect_uri"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: ExchangeGrantInput = parse_input(input)?;
        require("code", &params.code)?;

        let exchange = TokenExchange {
            client_id: params.client_id,
            redirect_uri: params.redirect_uri,
            code_verifier: params.code_verifier,
        };

        outcome(
            artifacts::exchange_authorization_grant(&ctx.issuer, &params.code, &exchange, &ctx.replay, ctx.now())
                .await,
        )
    }
}

/// PKCE verification tool.
pub struct VerifyPkceTool;

#[async_trait::async_trait]
impl ArtifactTool for VerifyPkceTool {
    fn name(&self) -> &'static str {
        "verify_pkce"
    }

    fn description(&self) -> &'static str {
        "Check a PKCE code_verifier against a code_challenge. Unknown methods never verify."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code_verifier": {"type": "string"},
                "code_challenge": {"type": "string"},
                "code_challenge_method": {"type": "string", "enum": ["plain", "S256"]}
            },
            "required": ["code_verifier", "code_challenge", "code_challenge_method"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, _ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: VerifyPkceInput = parse_input(input)?;
        let verified =
            pkce::verify(&params.code_verifier, &params.code_challenge, &params.code_challenge_method);
        outcome(Ok(json!({ "verified": verified })))
    }
}
