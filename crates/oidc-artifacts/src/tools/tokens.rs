//! Token registry tools: issue_tokens, validate_access_token, refresh_tokens, revoke_token.

use serde::Deserialize;
use serde_json::{Value, json};

use super::{ArtifactTool, ToolContext, outcome, parse_input, require};
use crate::error::ToolResult;
use crate::registry::TokenInfo;

/// Input for issuing a bearer token pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueTokensInput {
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
}

/// Input naming a single token.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenInput {
    pub token: String,
}

/// Input for refresh token rotation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshInput {
    pub refresh_token: String,
    pub client_id: String,
}

/// Bearer token pair issuance tool.
pub struct IssueTokensTool;

#[async_trait::async_trait]
impl ArtifactTool for IssueTokensTool {
    fn name(&self) -> &'static str {
        "issue_tokens"
    }

    fn description(&self) -> &'static str {
        "Issue an opaque access token and refresh token, typically after a successful grant exchange."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "client_id": {"type": "string"},
                "user_id": {"type": "string"},
                "scope": {"type": "string"}
            },
            "required": ["client_id", "user_id", "scope"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: IssueTokensInput = parse_input(input)?;
        require("client_id", &params.client_id)?;
        require("user_id", &params.user_id)?;

        let pair = ctx.registry.issue_pair(&params.client_id, &params.user_id, &params.scope, ctx.now()).await;
        outcome(Ok(pair))
    }
}

/// Access token validation tool.
pub struct ValidateAccessTokenTool;

#[async_trait::async_trait]
impl ArtifactTool for ValidateAccessTokenTool {
    fn name(&self) -> &'static str {
        "validate_access_token"
    }

    fn description(&self) -> &'static str {
        "Look up an access token and check its expiry. Returns the client, user and scope it was issued for."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "token": {"type": "string"}
            },
            "required": ["token"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: TokenInput = parse_input(input)?;
        let record = ctx.registry.validate_access(&params.token, ctx.now()).await;
        outcome(record.map(|r| TokenInfo::from(&r)))
    }
}

/// Refresh token rotation tool.
pub struct RefreshTokensTool;

#[async_trait::async_trait]
impl ArtifactTool for RefreshTokensTool {
    fn name(&self) -> &'static str {
        "refresh_tokens"
    }

    fn description(&self) -> &'static str {
        "Exchange a refresh token for a new pair. The old refresh token and its access token stop working."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "refresh_token": {"type": "string"},
                "client_id": {"type": "string"}
            },
            "required": ["refresh_token", "client_id"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: RefreshInput = parse_input(input)?;
        outcome(ctx.registry.refresh(&params.refresh_token, &params.client_id, ctx.now()).await)
    }
}

/// Token revocation tool.
pub struct RevokeTokenTool;

#[async_trait::async_trait]
impl ArtifactTool for RevokeTokenTool {
    fn name(&self) -> &'static str {
        "revoke_token"
    }

    fn description(&self) -> &'static str {
        "Delete an access or refresh token. Revoking a refresh token also revokes its access token."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "token": {"type": "string"}
            },
            "required": ["token"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value> {
        let params: TokenInput = parse_input(input)?;
        let revoked = ctx.registry.revoke(&params.token).await;
        outcome(Ok(json!({ "revoked": revoked })))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::config::Config;

    /// Counts events whose message equals `needle`.
    #[derive(Clone)]
    struct MessageCount {
        needle: &'static str,
        hits: Arc<AtomicUsize>,
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for MessageCount {
        fn on_event(&self, event: &tracing::Event<'_>, _: tracing_subscriber::layer::Context<'_, S>) {
            struct Message<'a>(&'a str, bool);

            impl tracing::field::Visit for Message<'_> {
                fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                    if field.name() == "message" && format!("{value:?}") == self.0 {
                        self.1 = true;
                    }
                }
            }

            let mut message = Message(self.needle, false);
            event.record(&mut message);
            if message.1 {
                self.hits.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_issue_tokens_logs_once() {
        let counter = MessageCount { needle: "Issued token pair", hits: Arc::new(AtomicUsize::new(0)) };
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let ctx = ToolContext::from_config(&Config::for_testing("https://op.example")).unwrap();

        let result = tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(IssueTokensTool.execute(
                &ctx,
                json!({"client_id": "c1", "user_id": "alice", "scope": "openid"}),
            ))
        })
        .unwrap();

        assert_eq!(result["ok"], true);
        assert_eq!(counter.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_token_inputs_reject_unknown_fields() {
        assert!(parse_input::<TokenInput>(json!({"token": "t", "extra": 1})).is_err());
        assert!(parse_input::<RefreshInput>(json!({"refresh_token": "t"})).is_err());
    }
}
