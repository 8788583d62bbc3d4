//! Guest-side agent
//!
//! Scans the guest's root registry, registers the full root set with the
//! listener, then sends a differential update whenever a later scan differs
//! from what the listener already knows.

use std::sync::Arc;
use tracing::{debug, info};

use vmroots_core::{diff, scan, ChangeSet, GuestId, Reporter, RootPair, Snapshot};

use crate::config::AgentConfig;
use crate::error::{DaemonError, Result};
use crate::transport::{BoxedStream, DuplexStream};
use crate::wire::{Message, MessageWriter};

/// Agent lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Connecting,
    Registering,
    Polling,
    Terminated,
}

/// Guest-side agent
pub struct Agent {
    config: AgentConfig,
    guest_id: GuestId,
    reporter: Arc<dyn Reporter + Send + Sync>,
    writer: Option<MessageWriter<BoxedStream>>,
    /// Root set the listener has been told about
    known: Snapshot,
    state: AgentState,
}

impl Agent {
    /// Create an agent; the configuration is validated here
    pub fn new(config: AgentConfig, reporter: Arc<dyn Reporter + Send + Sync>) -> Result<Self> {
        let guest_id = config.validate()?;
        Ok(Self {
            config,
            guest_id,
            reporter,
            writer: None,
            known: Snapshot::new(),
            state: AgentState::Connecting,
        })
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn guest_id(&self) -> GuestId {
        self.guest_id
    }

    /// The root set most recently sent to the listener
    pub fn known_roots(&self) -> &Snapshot {
        &self.known
    }

    /// Dial the configured endpoint
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting to {}...", self.config.endpoint);
        match self.config.endpoint.connect().await {
            Ok(stream) => {
                self.writer = Some(MessageWriter::new(stream));
                self.state = AgentState::Registering;
                Ok(())
            }
            Err(e) => {
                self.state = AgentState::Terminated;
                Err(e)
            }
        }
    }

    /// Use an already connected stream instead of dialing
    pub fn attach<S: DuplexStream>(&mut self, stream: S) {
        self.writer = Some(MessageWriter::new(Box::new(stream)));
        self.state = AgentState::Registering;
    }

    /// Scan once and send the full root set as the registration message
    pub async fn register(&mut self) -> Result<()> {
        self.expect_state(AgentState::Registering)?;

        info!("Initializing initial set of GC roots...");
        let snapshot = self.scan();
        log_pairs("Valid roots", &snapshot.pairs());

        let message = Message::Registration {
            id: self.guest_id,
            roots: snapshot.pairs(),
        };
        self.send(&message).await?;

        self.known = snapshot;
        self.state = AgentState::Polling;
        info!(
            "Registered guest {} with {} roots",
            self.guest_id,
            self.known.len()
        );
        Ok(())
    }

    /// Rescan and send an update if anything changed.
    ///
    /// The known root set only advances when an update was sent.
    pub async fn poll_once(&mut self) -> Result<Option<ChangeSet>> {
        self.expect_state(AgentState::Polling)?;

        debug!("Initiating refresh of GC roots...");
        let current = self.scan();
        let changes = diff(&self.known, &current);
        if changes.is_empty() {
            debug!("No changes. Going to sleep...");
            return Ok(None);
        }

        debug!("Sending differential update.");
        log_pairs("New", &changes.added);
        log_pairs("Removed", &changes.removed);
        self.send(&Message::from(changes.clone())).await?;

        self.known = current;
        debug!("Update sent. Going to sleep...");
        Ok(Some(changes))
    }

    /// Connect if needed, register, then poll forever.
    ///
    /// Only returns on a transport failure; nothing is resent.
    pub async fn run(&mut self) -> Result<()> {
        if self.writer.is_none() {
            self.connect().await?;
        }
        self.register().await?;

        info!("Periodic update started (interval: {}s).", self.config.interval_secs);
        loop {
            tokio::time::sleep(self.config.interval()).await;
            self.poll_once().await?;
        }
    }

    fn scan(&self) -> Snapshot {
        scan(
            &self.config.store_dir,
            &self.config.gcroots_dir,
            self.reporter.as_ref(),
        )
    }

    async fn send(&mut self, message: &Message) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| DaemonError::Transport("not connected".to_string()))?;
        let sent = writer.send(message).await;
        if let Err(e) = sent {
            self.state = AgentState::Terminated;
            return Err(match e {
                DaemonError::Io(io) => DaemonError::Transport(format!("send failed: {}", io)),
                other => other,
            });
        }
        Ok(())
    }

    fn expect_state(&self, expected: AgentState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DaemonError::InvalidState(format!(
                "agent is {:?}, expected {:?}",
                self.state, expected
            )))
        }
    }
}

fn log_pairs(label: &str, pairs: &[RootPair]) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        let lines: Vec<String> = pairs.iter().map(|pair| format!("- {}", pair)).collect();
        debug!("{}:\n{}", label, lines.join("\n"));
    }
}
