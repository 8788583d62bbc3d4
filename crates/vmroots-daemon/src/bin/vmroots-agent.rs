//! vmroots agent - Main entry point
//!
//! Runs inside a guest and keeps the host informed about which store paths
//! the guest's GC roots currently reference.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use vmroots_core::GuestId;
use vmroots_daemon::logging::init_logging;
use vmroots_daemon::transport::{DEFAULT_VSOCK_CID, DEFAULT_VSOCK_PORT};
use vmroots_daemon::{Agent, AgentConfig, Endpoint, TracingReporter};

#[derive(Parser)]
#[command(name = "vmroots-agent")]
#[command(
    about = "Send updates about currently valid GC roots inside a VM to the hypervisor host (or another VM)",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Print debug messages
    #[arg(short, long)]
    verbose: bool,

    /// JSON configuration file; command-line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the Nix store (default: /nix/store)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Path to GC roots (default: /nix/var/nix/gcroots)
    #[arg(short = 'r', long)]
    gcroots: Option<PathBuf>,

    /// Polling interval in seconds (default: 300)
    #[arg(short = 't', long)]
    interval: Option<u64>,

    /// vsock CID to which updates will be sent (default: 2)
    #[arg(short = 'a', long, conflicts_with = "endpoint")]
    address: Option<u32>,

    /// vsock port to which updates will be sent (default: 25565)
    #[arg(short, long, conflicts_with = "endpoint")]
    port: Option<u32>,

    /// Listener endpoint: vsock:<cid>:<port>, unix:<path> or tcp:<host>:<port>
    #[arg(short, long)]
    endpoint: Option<Endpoint>,

    /// UUID of the VM which is sending the updates
    uuid: Option<GuestId>,
}

impl Cli {
    fn into_config(self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::load(path)?,
            None => AgentConfig::default(),
        };

        if let Some(id) = self.uuid {
            config.guest_id = Some(id);
        }
        if let Some(store) = self.store {
            config.store_dir = store;
        }
        if let Some(gcroots) = self.gcroots {
            config.gcroots_dir = gcroots;
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        } else if self.address.is_some() || self.port.is_some() {
            let (cid, port) = match config.endpoint {
                Endpoint::Vsock { cid, port } => (cid, port),
                _ => (DEFAULT_VSOCK_CID, DEFAULT_VSOCK_PORT),
            };
            config.endpoint = Endpoint::Vsock {
                cid: self.address.unwrap_or(cid),
                port: self.port.unwrap_or(port),
            };
        }

        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("vmroots_agent", cli.verbose);

    info!("Starting vmroots agent v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.into_config()?;
    let mut agent = Agent::new(config, Arc::new(TracingReporter))?;

    tokio::select! {
        result = agent.run() => {
            if let Err(e) = result {
                error!("Agent terminated: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}
