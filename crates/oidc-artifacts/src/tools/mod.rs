//! Tool-call surface for the external decision engine.
//!
//! Each tool:
//! 1. Deserializes its own typed input (unknown fields rejected)
//! 2. Calls one artifact, PKCE or registry operation
//! 3. Returns a structured result: `{"ok": true, ...}` on success, or
//!    `{"ok": false, "error": <reason>, "oauth_error": <code>, "message": ...}`
//!    for an [`ArtifactError`]
//!
//! Malformed arguments and unknown tool names are [`ToolError`]s, never silently ignored.

mod grants;
mod identity;
mod tokens;

pub use grants::*;
pub use identity::*;
pub use tokens::*;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::Config;
use crate::context::IssuerContext;
use crate::error::{ArtifactError, ArtifactResult, ToolError, ToolResult};
use crate::registry::{ReplayGuard, TokenRegistry};

/// Tool execution context.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Secret and (possibly request-scoped) issuer.
    pub issuer: IssuerContext,
    /// Bearer token registry.
    pub registry: TokenRegistry,
    /// Consumed grant identifiers.
    pub replay: ReplayGuard,
    /// Authorization grant lifetime in seconds.
    pub grant_ttl: i64,
    /// Identity assertion lifetime in seconds.
    pub assertion_ttl: i64,
    fixed_now: Option<i64>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub fn new(issuer: IssuerContext, registry: TokenRegistry, replay: ReplayGuard, config: &Config) -> Self {
        Self {
            issuer,
            registry,
            replay,
            grant_ttl: config.grant_ttl,
            assertion_ttl: config.assertion_ttl,
            fixed_now: None,
        }
    }

    /// Build the whole context from configuration with an in-memory registry.
    pub fn from_config(config: &Config) -> Result<Self, crate::error::ConfigError> {
        Ok(Self::new(
            config.issuer_context()?,
            TokenRegistry::in_memory(config),
            ReplayGuard::new(),
            config,
        ))
    }

    /// Copy of this context whose artifacts carry `url` as `iss`.
    pub fn with_issuer(&self, url: &str) -> ArtifactResult<Self> {
        Ok(Self { issuer: self.issuer.with_issuer(url)?, ..self.clone() })
    }

    /// Pin the clock, for deterministic tests and replays.
    #[must_use]
    pub fn with_fixed_clock(self, now: i64) -> Self {
        Self { fixed_now: Some(now), ..self }
    }

    /// Current unix time in seconds.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.fixed_now.unwrap_or_else(|| chrono::Utc::now().timestamp())
    }
}

/// Trait for decision-engine tools.
#[async_trait::async_trait]
pub trait ArtifactTool: Send + Sync {
    /// Tool name (e.g., "issue_authorization_grant").
    fn name(&self) -> &'static str;

    /// Tool description for the decision engine.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: Value) -> ToolResult<Value>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn ArtifactTool>> {
    vec![
        // Grant tools (4)
        Box::new(grants::IssueAuthorizationGrantTool),
        Box::new(grants::RedeemAuthorizationGrantTool),
        Box::new(grants::ExchangeAuthorizationGrantTool),
        Box::new(grants::VerifyPkceTool),

        // Identity tools (2)
        Box::new(identity::IssueIdentityAssertionTool),
        Box::new(identity::VerifyIdentityAssertionTool),

        // Token registry tools (4)
        Box::new(tokens::IssueTokensTool),
        Box::new(tokens::ValidateAccessTokenTool),
        Box::new(tokens::RefreshTokensTool),
        Box::new(tokens::RevokeTokenTool),
    ]
}

/// Look up a tool by name. Unknown names fail closed.
pub fn find_tool<'a>(tools: &'a [Box<dyn ArtifactTool>], name: &str) -> ToolResult<&'a dyn ArtifactTool> {
    tools
        .iter()
        .find(|t| t.name() == name)
        .map(|t| t.as_ref())
        .ok_or_else(|| ToolError::UnknownTool(name.to_owned()))
}

/// Resolve and execute a tool call.
pub async fn dispatch(
    tools: &[Box<dyn ArtifactTool>],
    ctx: &ToolContext,
    name: &str,
    arguments: Value,
) -> ToolResult<Value> {
    let tool = find_tool(tools, name)?;
    tracing::debug!(tool = %name, "Dispatching tool call");
    tool.execute(ctx, arguments).await
}

/// Deserialize tool input, rejecting unknown fields via the input type.
pub(crate) fn parse_input<T: DeserializeOwned>(input: Value) -> ToolResult<T> {
    Ok(serde_json::from_value(input)?)
}

/// Reject empty required string arguments.
pub(crate) fn require(field: &str, value: &str) -> ToolResult<()> {
    if value.trim().is_empty() {
        return Err(ToolError::validation(field, "cannot be empty"));
    }
    Ok(())
}

/// Fold an artifact outcome into the structured tool result.
pub(crate) fn outcome<T: Serialize>(result: ArtifactResult<T>) -> ToolResult<Value> {
    match result {
        Ok(value) => {
            let mut body = json!({ "ok": true });
            match serde_json::to_value(value)? {
                Value::Object(fields) => {
                    if let Value::Object(ref mut map) = body {
                        map.extend(fields);
                    }
                }
                other => body["result"] = other,
            }
            Ok(body)
        }
        Err(err) => Ok(failure(&err)),
    }
}

fn failure(err: &ArtifactError) -> Value {
    json!({
        "ok": false,
        "error": err.code(),
        "oauth_error": err.oauth_error(),
        "message": err.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_unique() {
        let tools = register_all_tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_find_tool_fails_closed() {
        let tools = register_all_tools();
        assert!(find_tool(&tools, "verify_pkce").is_ok());
        assert!(matches!(find_tool(&tools, "VERIFY_PKCE"), Err(ToolError::UnknownTool(_))));
        assert!(matches!(find_tool(&tools, ""), Err(ToolError::UnknownTool(_))));
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in register_all_tools() {
            let schema = tool.input_schema();
            assert_eq!(schema["type"], "object", "{}", tool.name());
            assert!(schema["properties"].is_object(), "{}", tool.name());
        }
    }

    #[test]
    fn test_outcome_shapes() {
        let ok = outcome::<bool>(Ok(true)).unwrap();
        assert_eq!(ok, json!({"ok": true, "result": true}));

        let err = outcome::<bool>(Err(ArtifactError::PkceFailure)).unwrap();
        assert_eq!(err["ok"], false);
        assert_eq!(err["error"], "pkce_failure");
        assert_eq!(err["oauth_error"], "invalid_grant");
    }
}
