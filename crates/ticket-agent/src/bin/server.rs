//! The MCP ticket server, speaking the protocol over stdio.

#[macro_use]
extern crate tracing;

use anyhow::Context as _;
use clap::Parser;
use ticket_agent::config::ServerArgs;
use ticket_agent::mcp::serve_stdio;
use ticket_agent::tools::tracker_registry;
use ticket_agent::tracker::TrackerClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    // Stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = ServerArgs::parse();
    debug!("starting with {args:?}");

    let client = TrackerClient::new(args.tracker_config())
        .context("failed to create the tracker client")?;
    serve_stdio(tracker_registry(client))
        .await
        .context("ticket server failed")?;
    Ok(())
}
