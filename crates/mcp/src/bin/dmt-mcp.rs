// Standalone MCP server binary

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dmt_mcp::config::{self, BridgeConfig, FileConfig, Overrides};
use dmt_mcp::server::McpServer;
use dmt_mcp::tools::{register_dmt_tools, ToolRegistry};
use std::path::PathBuf;
use std::sync::Arc;

const INSTRUCTIONS: &str = "Tools for Intel AMT devices managed by a Device Management Toolkit deployment. \
Use get_devices to discover device GUIDs, then pass a GUID to the per-device tools. \
do_power_action changes the power state of a real machine; confirm with the user before calling it.";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "dmt-mcp")]
#[command(about = "MCP server for the Device Management Toolkit (MPS/RPS)", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file [default: dmt-mcp.toml]
    #[arg(short, long, env = "DMT_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// MPS REST API base URL
    #[arg(long, env = "DMT_API_BASE")]
    mps_url: Option<String>,

    /// RPS REST API base URL
    #[arg(long, env = "DMT_RPS_API_BASE")]
    rps_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Exit if the initial MPS authorization fails
    #[arg(long)]
    strict_startup: bool,

    /// Log output format (logs always go to stderr)
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dmt_mcp=info,dmt_sdk=info".into());

    // stdout carries the protocol
    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    config::hydrate_env_file()?;
    let args = Args::parse();
    init_tracing(args.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "DMT MCP Server starting...");

    // Load configuration
    let (config_path, explicit) = match args.config {
        Some(path) => (path, true),
        None => (PathBuf::from(config::DEFAULT_CONFIG_FILE), false),
    };
    let file = FileConfig::load(&config_path, explicit)?;
    let overrides = Overrides {
        mps_url: args.mps_url,
        rps_url: args.rps_url,
        timeout_secs: args.timeout_secs,
        strict_startup: args.strict_startup,
    };
    let bridge = BridgeConfig::from_process_env(file, &overrides)?;

    tracing::info!(
        mps = %bridge.mps_url,
        rps = %bridge.rps_url,
        username = %bridge.credentials.username,
        "Using DMT endpoints"
    );

    let client = Arc::new(bridge.build_client().context("Failed to create DMT client")?);

    match client.authorize().await {
        Ok(()) => tracing::info!("Authenticated with MPS"),
        Err(e) if bridge.strict_startup => {
            return Err(e).context("Initial MPS authorization failed");
        }
        Err(e) => tracing::warn!(
            error = %e,
            "Initial MPS authorization failed; tool calls will retry authorization"
        ),
    }

    // Create tool registry
    let mut registry = ToolRegistry::new();
    register_dmt_tools(&mut registry, client.clone());

    tracing::info!("Registered {} tools", registry.len());

    // Start MCP server
    let server = McpServer::new(registry, client).with_instructions(INSTRUCTIONS);
    server.start().await?;

    Ok(())
}
