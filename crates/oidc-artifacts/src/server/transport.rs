//! JSON-RPC 2.0 tool-call protocol and the HTTP transport.
//!
//! Behind a reverse proxy the HTTP transport derives a request-scoped issuer from
//! `X-Forwarded-Proto` and `X-Forwarded-Host` before dispatching, so `iss` reflects
//! the public origin. `Host` alone is only the address the caller dialled and never
//! replaces the configured issuer.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::error::ToolError;
use crate::tools::{self, ArtifactTool, ToolContext};

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Standard JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const TOOL_ERROR: i32 = -32000;
}

impl JsonRpcResponse {
    /// JSON-RPC version constant.
    const VERSION: &'static str = "2.0";

    #[must_use]
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: Some(result),
            error: None,
            id,
        }
    }

    #[must_use]
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }
}

/// Tool info for tools/list response.
#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Route one JSON-RPC request.
pub async fn handle_request(
    req: &JsonRpcRequest,
    tools: &[Box<dyn ArtifactTool>],
    ctx: &ToolContext,
) -> JsonRpcResponse {
    match req.method.as_str() {
        "initialize" => handle_initialize(req.id.clone(), &req.params),
        "initialized" | "ping" => JsonRpcResponse::success(req.id.clone(), serde_json::json!({})),
        "tools/list" => handle_tools_list(req.id.clone(), tools),
        "tools/call" => handle_tools_call(req.id.clone(), &req.params, tools, ctx).await,
        _ => JsonRpcResponse::error(
            req.id.clone(),
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    }
}

fn handle_initialize(id: Option<serde_json::Value>, params: &serde_json::Value) -> JsonRpcResponse {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(|v| v.as_str())
        .unwrap_or("2024-11-05");

    tracing::info!("Initialize: protocol version {}", protocol_version);

    JsonRpcResponse::success(
        id,
        serde_json::json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": "oidc-artifacts",
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    )
}

fn handle_tools_list(id: Option<serde_json::Value>, tools: &[Box<dyn ArtifactTool>]) -> JsonRpcResponse {
    let tool_list: Vec<ToolInfo> = tools
        .iter()
        .map(|t| ToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            input_schema: t.input_schema(),
        })
        .collect();

    JsonRpcResponse::success(
        id,
        serde_json::json!({
            "tools": tool_list
        }),
    )
}

async fn handle_tools_call(
    id: Option<serde_json::Value>,
    params: &serde_json::Value,
    tools: &[Box<dyn ArtifactTool>],
    ctx: &ToolContext,
) -> JsonRpcResponse {
    let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing 'name' parameter");
    };

    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or(serde_json::json!({}));

    tracing::info!(tool = %tool_name, "Executing tool");

    match tools::dispatch(tools, ctx, tool_name, arguments).await {
        Ok(result) => {
            let is_error = result.get("ok").and_then(serde_json::Value::as_bool) == Some(false);
            if is_error {
                tracing::info!(tool = %tool_name, reason = %result["error"], "Tool call rejected");
            }
            JsonRpcResponse::success(
                id,
                serde_json::json!({
                    "content": [{
                        "type": "text",
                        "text": result.to_string()
                    }],
                    "structuredContent": result,
                    "isError": is_error
                }),
            )
        }
        Err(e @ (ToolError::UnknownTool(_) | ToolError::Validation { .. } | ToolError::Serialization(_))) => {
            tracing::warn!(tool = %tool_name, error = %e, "Rejected tool call");
            JsonRpcResponse::error(id, codes::INVALID_PARAMS, e.to_user_message())
        }
        Err(e) => {
            tracing::error!(tool = %tool_name, error = %e, "Tool execution failed");
            JsonRpcResponse::error(id, codes::TOOL_ERROR, format!("Tool error: {}", e))
        }
    }
}

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub tools: Vec<Box<dyn ArtifactTool>>,
    pub ctx: ToolContext,
}

/// Create the HTTP router.
pub fn create_router(tools: Vec<Box<dyn ArtifactTool>>, ctx: ToolContext) -> Router {
    let state = Arc::new(HttpState { tools, ctx });

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/rpc", post(handle_rpc_post))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "oidc-artifacts",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Handle POST requests to /rpc.
async fn handle_rpc_post(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    tracing::debug!(method = %req.method, "Handling RPC request");

    let scoped = request_issuer(&headers)
        .and_then(|issuer| match state.ctx.with_issuer(&issuer) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unusable request origin");
                None
            }
        });
    let ctx = scoped.as_ref().unwrap_or(&state.ctx);

    Json(handle_request(&req, &state.tools, ctx).await)
}

/// Public origin of a request as named by the forwarding proxy.
///
/// Requires both `X-Forwarded-Proto` and `X-Forwarded-Host`. Values that are not a
/// bare http(s) origin (a path, query or credentials smuggled into the host) are
/// ignored. Only scheme, host and port survive.
#[must_use]
pub fn request_issuer(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let host = header("x-forwarded-host")?;
    let scheme = header("x-forwarded-proto")?;

    let url = Url::parse(&format!("{scheme}://{host}")).ok()?;
    let bare = matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
        && url.path() == "/"
        && url.query().is_none()
        && url.fragment().is_none()
        && url.username().is_empty()
        && url.password().is_none();
    if !bare {
        tracing::warn!(host = %host, "Ignoring forwarded origin that is not a bare http(s) origin");
        return None;
    }

    Some(url.origin().ascii_serialization())
}
