//! Host-side listener
//!
//! Serves exactly one guest stream: waits for the registration, resets the
//! guest's mirror directory to the announced root set, then applies every
//! update in arrival order until the stream closes. Mirror entries are left
//! in place on close so that an unreachable guest keeps its roots.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tracing::{debug, info};

use vmroots_core::{GuestId, Mirror, Reporter, RootPair};

use crate::config::ListenerConfig;
use crate::error::{DaemonError, Result};
use crate::notify::Notifier;
use crate::wire::{Message, MessageReader};

/// Listener lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    AwaitingRegistration,
    Active,
    Closed,
}

/// Host-side listener for a single guest stream
pub struct Listener<R> {
    config: ListenerConfig,
    messages: MessageReader<R>,
    notifier: Arc<dyn Notifier>,
    reporter: Arc<dyn Reporter + Send + Sync>,
    mirror: Option<Mirror>,
    guest_id: Option<GuestId>,
    state: ListenerState,
    updates_applied: u64,
}

impl<R> Listener<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(
        config: ListenerConfig,
        reader: R,
        notifier: Arc<dyn Notifier>,
        reporter: Arc<dyn Reporter + Send + Sync>,
    ) -> Self {
        Self {
            config,
            messages: MessageReader::new(reader),
            notifier,
            reporter,
            mirror: None,
            guest_id: None,
            state: ListenerState::AwaitingRegistration,
            updates_applied: 0,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// The registered guest, once known
    pub fn guest_id(&self) -> Option<GuestId> {
        self.guest_id
    }

    /// The registered guest's mirror directory, once known
    pub fn mirror_dir(&self) -> Option<&Path> {
        self.mirror.as_ref().map(Mirror::dir)
    }

    pub fn updates_applied(&self) -> u64 {
        self.updates_applied
    }

    /// Serve the whole session: registration, then updates until end of stream
    pub async fn run(&mut self) -> Result<GuestId> {
        let guest_id = self.await_registration().await?;
        self.serve_updates().await?;
        Ok(guest_id)
    }

    /// Read the registration and reset the guest's mirror to its root set
    pub async fn await_registration(&mut self) -> Result<GuestId> {
        self.expect_state(ListenerState::AwaitingRegistration)?;
        debug!("Registering client...");

        let (id, roots) = match self.messages.next_message().await? {
            Some(Message::Registration { id, roots }) => (id, roots),
            Some(other) => {
                return Err(DaemonError::Protocol(format!(
                    "expected init as first message, got {}",
                    other.kind()
                )))
            }
            None => {
                return Err(DaemonError::Protocol(
                    "stream closed before registration".to_string(),
                ))
            }
        };

        let mirror = Mirror::open(&self.config.mirror_root, &self.config.store_dir, &id)?;
        info!(
            "Registered client {}. Store path: {:?}. GC roots: {:?}.",
            id,
            mirror.store(),
            mirror.dir()
        );

        debug!("Clearing previous roots...");
        let cleared = mirror.clear(self.reporter.as_ref())?;
        debug!("Populating directory with {} initial roots...", roots.len());
        let written = mirror.register(&roots, self.reporter.as_ref())?;
        debug!("Cleared {} stale roots, registered {}", cleared, written);

        self.mirror = Some(mirror);
        self.guest_id = Some(id);
        self.state = ListenerState::Active;
        self.notifier.ready(&format!("Serving requests from {}", id));
        info!("Listening for periodic updates...");
        Ok(id)
    }

    /// Apply updates until the peer closes the stream
    pub async fn serve_updates(&mut self) -> Result<()> {
        while self.process_next().await? {}
        Ok(())
    }

    /// Apply the next update; returns false once the stream has ended.
    ///
    /// One message is the unit of progress: it is applied completely before
    /// the next one is read.
    pub async fn process_next(&mut self) -> Result<bool> {
        self.expect_state(ListenerState::Active)?;

        match self.messages.next_message().await? {
            Some(Message::Update { added, removed }) => {
                debug!("Update received. Resuming operations...");
                self.apply_update(&added, &removed)?;
                self.updates_applied += 1;
                debug!("Finished processing updates. Sleeping...");
                Ok(true)
            }
            Some(Message::Registration { id, .. }) => Err(DaemonError::Protocol(format!(
                "unexpected second init from {}",
                id
            ))),
            None => {
                self.state = ListenerState::Closed;
                self.notifier.stopping();
                info!(
                    "Stream closed after {} updates; keeping mirrored roots",
                    self.updates_applied
                );
                Ok(false)
            }
        }
    }

    /// Removals first, then additions.
    ///
    /// A root that is both removed and re-added with an admissible target is
    /// not unlinked: registering it replaces the entry atomically, so the
    /// store path it points at is never left without a mirror entry. A
    /// re-added root whose new target is rejected is unlinked like any other
    /// removal.
    fn apply_update(&self, added: &[RootPair], removed: &[RootPair]) -> Result<()> {
        let mirror = self
            .mirror
            .as_ref()
            .ok_or_else(|| DaemonError::InvalidState("no mirror directory".to_string()))?;

        let re_added: HashSet<&Path> = added
            .iter()
            .filter(|pair| mirror.admits(pair.target()))
            .map(RootPair::root)
            .collect();
        let gone = removed
            .iter()
            .map(RootPair::root)
            .filter(|root| !re_added.contains(root));

        mirror.unregister(gone, self.reporter.as_ref())?;
        mirror.register(added, self.reporter.as_ref())?;
        Ok(())
    }

    fn expect_state(&self, expected: ListenerState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DaemonError::InvalidState(format!(
                "listener is {:?}, expected {:?}",
                self.state, expected
            )))
        }
    }
}
