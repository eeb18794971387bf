//! Stdio transport.
//!
//! Handles newline-delimited JSON-RPC 2.0 over stdin/stdout. The issuer is always
//! the process default; there is no inbound request to derive one from.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::tools::{ArtifactTool, ToolContext};

use super::transport::{JsonRpcRequest, JsonRpcResponse, codes, handle_request};

/// Serve tool calls over the process's stdin/stdout.
pub async fn run_stdio(tools: Vec<Box<dyn ArtifactTool>>, ctx: ToolContext) -> anyhow::Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    tracing::info!("Stdio server ready, waiting for requests...");
    serve_lines(reader, writer, &tools, &ctx).await
}

/// Serve newline-delimited requests until EOF.
pub async fn serve_lines<R, W>(
    mut reader: R,
    mut writer: W,
    tools: &[Box<dyn ArtifactTool>],
    ctx: &ToolContext,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            // EOF
            tracing::info!("Input closed, shutting down");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => {
                tracing::debug!(method = %request.method, "Received request");
                handle_request(&request, tools, ctx).await
            }
            Err(e) => JsonRpcResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {}", e)),
        };

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}
