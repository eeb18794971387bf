//! Identity tools: issue_identity_assertion, verify_identity_assertion.

use serde::Deserialize;
use serde_json::{Value, json};

use super::{ArtifactTool, ToolContext, outcome, parse_input, require};
use crate::artifacts;
use crate::error::ToolResult;

/// Input for issuing an identity assertion.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueAssertionInput {
    pub sub: String,
    pub aud: String,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub auth_time: Option<i64>,
}

/// Input for verifying an identity assertion.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyAssertionInput {
    pub id_token: String,
    pub aud: String,
}

/// Identity assertion issuance tool.
pub struct IssueIdentityAssertionTool;

#[async_trait::async_trait]
impl ArtifactTool for IssueIdentityAssertionTool {
    fn name(&self) -> &'static str {
        "issue_identity_assertion"
    }

    fn description(&self) -> &'static str {
        "Issue a signed ID token asserting the subject's identity to one client."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sub": {"type": "string", "description": "Subject identifier"},
                "aud": {"type": "string", "description": "Client the assertion is for"},
                "nonce": {"type": "string", "description": "Nonce from the authorization request"},
                "auth_time": {"type": "integer", "description": "Unix time of authentication; defaults to now"}
            },
            "required": ["sub", "aud"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: IssueAssertionInput = parse_input(input)?;
        require("sub", &params.sub)?;
        require("aud", &params.aud)?;

        let assertion = artifacts::issue_identity_assertion(
            &ctx.issuer,
            &params.sub,
            &params.aud,
            params.nonce.as_deref(),
            params.auth_time,
            ctx.assertion_ttl,
            ctx.now(),
        );
        outcome(assertion.map(|id_token| json!({ "id_token": id_token, "expires_in": ctx.assertion_ttl })))
    }
}

/// Identity assertion verification tool.
pub struct VerifyIdentityAssertionTool;

#[async_trait::async_trait]
impl ArtifactTool for VerifyIdentityAssertionTool {
    fn name(&self) -> &'static str {
        "verify_identity_assertion"
    }

    fn description(&self) -> &'static str {
        "Verify an ID token's signature, expiry and audience and return its claims."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id_token": {"type": "string"},
                "aud": {"type": "string", "description": "Expected audience"}
            },
            "required": ["id_token", "aud"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: VerifyAssertionInput = parse_input(input)?;
        outcome(artifacts::verify_identity_assertion(&ctx.issuer, &params.id_token, &params.aud, ctx.now()))
    }
}
