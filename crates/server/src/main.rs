use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

mod api;
mod config;
mod session;

use config::{Overrides, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "fuseki-mcp")]
#[command(about = "MCP tool server for Apache Jena Fuseki (Streamable HTTP)", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "JENA_MCP_CONFIG", default_value = "jena-mcp.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, env = "JENA_MCP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fuseki_mcp=info,jena_mcp=info,jena_fuseki=info,tower_http=info".into());
    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    tracing::info!("Starting Jena MCP connector");

    // Load configuration
    let config = ServerConfig::load(&args.config, args.overrides)?;
    tracing::info!(
        fuseki = %config.fuseki.base_url,
        dataset = %config.fuseki.dataset,
        auth = config.fuseki.has_credentials(),
        "Forwarding to Fuseki"
    );

    api::serve(config).await?;

    Ok(())
}
