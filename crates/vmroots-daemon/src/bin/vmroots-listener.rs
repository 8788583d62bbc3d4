//! vmroots listener - Main entry point
//!
//! Serves one guest stream and mirrors the guest's GC roots on this host.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{debug, error, info};

use vmroots_daemon::logging::init_logging;
use vmroots_daemon::transport::{listener_input, ListenerInput};
use vmroots_daemon::{
    Listener, ListenerConfig, NoopNotifier, Notifier, SystemdNotifier, TracingReporter,
};

#[derive(Parser)]
#[command(name = "vmroots-listener")]
#[command(about = "Receive updates about currently valid GC roots inside a VM", long_about = None)]
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

    /// Path to per-VM GC roots (default: /nix/var/nix/gcroots/per-vm)
    #[arg(short = 'r', long)]
    gcroots: Option<PathBuf>,

    /// Do not report readiness to the service manager
    #[arg(long)]
    no_notify: bool,
}

impl Cli {
    fn into_config(self) -> Result<ListenerConfig> {
        let mut config = match &self.config {
            Some(path) => ListenerConfig::load(path)?,
            None => ListenerConfig::default(),
        };

        if let Some(store) = self.store {
            config.store_dir = store;
        }
        if let Some(gcroots) = self.gcroots {
            config.mirror_root = gcroots;
        }
        if self.no_notify {
            config.notify = false;
        }

        config.validate()?;
        config.canonicalize()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("vmroots_listener", cli.verbose);

    info!("Starting vmroots listener v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.into_config()?;

    debug!("Opening stream...");
    let input = listener_input().context("Invalid socket activation environment")?;
    match input {
        ListenerInput::Activated(fd) => debug!("Opening service-manager supplied socket on fd {}...", fd),
        ListenerInput::Stdin => debug!("Reading from stdin."),
    }
    let reader = BufReader::new(input.open());

    let notifier: Arc<dyn Notifier> = if config.notify {
        Arc::new(SystemdNotifier)
    } else {
        Arc::new(NoopNotifier)
    };

    let mut listener = Listener::new(config, reader, notifier, Arc::new(TracingReporter));
    if let Err(e) = listener.run().await {
        error!("Listener terminated: {}", e);
        return Err(e.into());
    }

    debug!("Exiting...");
    Ok(())
}
