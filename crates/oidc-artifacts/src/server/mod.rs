//! Tool-call server.
//!
//! Exposes the artifact tools to the decision engine over stdio or HTTP, and owns
//! the background registry sweep.

pub mod stdio;
pub mod transport;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::tools::{self, ArtifactTool, ToolContext};

/// Tool-call server for the signed-artifact core.
pub struct ArtifactServer {
    /// Tool execution context.
    ctx: ToolContext,

    /// Registered tools.
    tools: Vec<Box<dyn ArtifactTool>>,
}

impl ArtifactServer {
    /// Create a new server with every tool registered.
    #[must_use]
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx, tools: tools::register_all_tools() }
    }

    /// Start the periodic sweep of expired tokens and consumed grants.
    pub fn start_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        tracing::info!(interval_secs = interval.as_secs(), "Starting registry sweep task");
        self.ctx.registry.start_sweep_task(self.ctx.replay.clone(), interval)
    }

    /// Run the server in stdio mode.
    ///
    /// # Errors
    ///
    /// Returns error on I/O failure.
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        tracing::info!("Starting tool server in stdio mode");
        tracing::info!("Registered {} tools", self.tools.len());

        stdio::run_stdio(self.tools, self.ctx).await
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on server failure.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        tracing::info!("Starting tool server in HTTP mode on port {}", port);
        tracing::info!("Registered {} tools", self.tools.len());

        let router = transport::create_router(self.tools, self.ctx);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!("HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for ArtifactServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactServer").field("tools", &self.tools.len()).finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_until_aborted() {
        let ctx = ToolContext::from_config(&Config::for_testing("https://op.example")).unwrap();
        let server = ArtifactServer::new(ctx);
        assert!(format!("{server:?}").contains("tools: 10"));

        let handle = server.start_sweeper(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(121)).await;
        assert!(!handle.is_finished());
        handle.abort();
    }
}
