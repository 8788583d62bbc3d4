//! Subscriber setup shared by the binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise [`default_filter`] applies. Output goes
/// to stderr so that a listener reading stdin never mixes protocol and log
/// lines.
pub fn init_logging(binary_target: &str, verbose: bool) {
    let fallback = default_filter(binary_target, verbose);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// The vmroots crates and the calling binary at `info`, or `debug` with `verbose`
pub fn default_filter(binary_target: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("vmroots_daemon={level},vmroots_core={level},{binary_target}={level}")
}
