//! OIDC artifact tool server - Entry Point
//!
//! Provides both stdio and HTTP transports.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use oidc_artifacts::{config::Config, server::ArtifactServer, tools::ToolContext};

#[derive(Parser, Debug)]
#[command(name = "oidc-artifacts")]
#[command(about = "Signed grants, ID tokens, PKCE and bearer tokens as callable tools")]
#[command(version)]
struct Cli {
    /// HMAC signing secret (required)
    #[arg(long, env = "OIDC_SIGNING_SECRET", hide_env_values = true)]
    signing_secret: Option<String>,

    /// Default issuer when the request does not supply an origin
    #[arg(long, env = "OIDC_ISSUER")]
    issuer: Option<String>,

    /// Transport mode: stdio or http
    #[arg(long, default_value = "stdio")]
    transport: Transport,

    /// HTTP server port (only used with --transport http)
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Registry sweep interval in seconds
    #[arg(long, default_value = "60")]
    sweep_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Transport {
    /// Standard input/output
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST
    Http,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    // Logs go to stderr so they never interleave with stdio responses.
    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?cli.transport,
        "Starting OIDC artifact server"
    );

    let config = match cli.signing_secret {
        Some(secret) => Config::new(secret, cli.issuer),
        None => Config::from_env()?,
    };
    let config = Config { sweep_interval: std::time::Duration::from_secs(cli.sweep_interval.max(1)), ..config };

    let ctx = ToolContext::from_config(&config)?;
    tracing::info!(issuer = %ctx.issuer.issuer(), "Issuer context ready");

    let server = ArtifactServer::new(ctx);
    let _sweeper = server.start_sweeper(config.sweep_interval);

    match cli.transport {
        Transport::Stdio => {
            tracing::info!("Running in stdio mode");
            server.run_stdio().await?;
        }
        Transport::Http => {
            tracing::info!(port = cli.port, "Running in HTTP mode");
            server.run_http(cli.port).await?;
        }
    }

    Ok(())
}
