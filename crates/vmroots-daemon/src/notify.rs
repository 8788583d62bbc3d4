//! Service manager notification

use sd_notify::NotifyState;
use tracing::warn;

/// Receives the listener's lifecycle transitions
pub trait Notifier: Send + Sync {
    /// The registration has been applied and updates are being served
    fn ready(&self, status: &str);

    /// The stream ended and the listener is about to exit
    fn stopping(&self);
}

/// Reports to systemd through `NOTIFY_SOCKET`; a no-op when it is unset
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemdNotifier;

impl Notifier for SystemdNotifier {
    fn ready(&self, status: &str) {
        if let Err(e) = sd_notify::notify(false, &[NotifyState::Ready, NotifyState::Status(status)])
        {
            warn!("Failed to notify service manager: {}", e);
        }
    }

    fn stopping(&self) {
        if let Err(e) = sd_notify::notify(
            false,
            &[NotifyState::Stopping, NotifyState::Status("Shutting down...")],
        ) {
            warn!("Failed to notify service manager: {}", e);
        }
    }
}

/// Ignores every transition
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn ready(&self, _status: &str) {}

    fn stopping(&self) {}
}
