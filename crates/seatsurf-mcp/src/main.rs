//! Seatsurfing MCP Server
//!
//! Exposes Seatsurfing desk booking to Claude and other AI assistants via
//! the Model Context Protocol (MCP).
//!
//! Usage:
//!   seatsurf-mcp [--home <DIR>] [--no-auto-login]
//!
//! The server communicates over stdio using JSON-RPC 2.0.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use seatsurf_core::Paths;
use seatsurf_mcp::{McpServer, ToolHandler};

#[derive(Parser)]
#[command(name = "seatsurf-mcp")]
#[command(about = "MCP server for Seatsurfing desk and room booking")]
#[command(version)]
#[command(after_help = r#"CREDENTIALS:
    Login values are taken from tool arguments first, then from
    SEATSURFING_URL, SEATSURFING_EMAIL, SEATSURFING_PASSWORD and
    SEATSURFING_ORG_ID, then from <home>/config.json.

FILES:
    <home>/config.json   Stored credentials
    <home>/spaces.json   Cached locations and spaces

    <home> defaults to ~/.seatsurfing (override with SEATSURFING_HOME).
"#)]
struct Cli {
    /// Directory holding config.json and spaces.json
    #[arg(long, value_name = "DIR")]
    home: Option<PathBuf>,

    /// Do not log in at startup, even when credentials are configured
    #[arg(long)]
    no_auto_login: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for MCP protocol)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let paths = cli.home.map(Paths::at).unwrap_or_else(Paths::new);
    tracing::info!("Starting Seatsurfing MCP server (home: {})", paths.root.display());

    let handler = Arc::new(ToolHandler::new(&paths));

    if !cli.no_auto_login {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            match handler.auto_login().await {
                Ok(true) => {
                    let url = handler.session().base_url().await.unwrap_or_default();
                    tracing::info!("Auto-login to {} succeeded", url);
                }
                Ok(false) => {}
                Err(e) => tracing::warn!("Auto-login failed: {}", e),
            }
        });
    }

    let server = McpServer::new(handler);
    server.run().await.context("MCP server stopped on an I/O error")?;

    Ok(())
}
