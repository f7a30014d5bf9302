//! ANP Bridge Server
//!
//! Multi-tenant HTTP bridge to the Agent Network Protocol.

use anpbridge_core::{init_logging, LoggingConfig};
use anpbridge_web::{server::AnpBridgeServerBuilder, WebConfig};
use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// ANP Bridge Server - session-aware HTTP gateway to ANP agents
#[derive(Parser, Debug)]
#[command(name = "anpbridge-web")]
#[command(about = "Multi-tenant stateful bridge to the Agent Network Protocol")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Require an Authorization header when a request opens a session
    #[arg(long)]
    enable_auth: bool,

    /// Accept only this bearer token (implies --enable-auth)
    #[arg(long)]
    auth_token: Option<String>,

    /// Seconds of inactivity before a session is reaped
    #[arg(long)]
    session_timeout: Option<u64>,

    /// Seconds between reaper sweeps
    #[arg(long)]
    cleanup_interval: Option<u64>,

    /// DID document handed out by the built-in resolvers
    #[arg(long)]
    did_document: Option<PathBuf>,

    /// DID private key handed out by the built-in resolvers
    #[arg(long)]
    did_private_key: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "ANPBRIDGE_CONFIG_FILE")]
    config: Option<PathBuf>,
}

impl Args {
    /// Flags win over the file and the environment
    fn apply(self, config: &mut WebConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.enable_auth {
            config.enable_auth = true;
        }
        if let Some(token) = self.auth_token {
            config.enable_auth = true;
            config.auth_token = Some(token);
        }
        if let Some(timeout) = self.session_timeout {
            config.session.idle_timeout_secs = timeout;
        }
        if let Some(interval) = self.cleanup_interval {
            config.session.sweep_interval_secs = interval;
        }
        if let Some(path) = self.did_document {
            config.did_document_path = path;
        }
        if let Some(path) = self.did_private_key {
            config.did_private_key_path = path;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(&LoggingConfig::with_level(&args.log_level))
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let mut config = WebConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);

    info!(
        address = %config.address(),
        auth_enabled = config.enable_auth,
        did_document = %config.did_document_path.display(),
        "Starting ANP Bridge Server"
    );

    let server = AnpBridgeServerBuilder::new()
        .config(config)
        .build()
        .await
        .context("Failed to build server")?;

    server.start().await.context("Server failed")?;

    info!("Server shut down gracefully");
    Ok(())
}
