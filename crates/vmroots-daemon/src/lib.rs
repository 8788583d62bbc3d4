//! vmroots Daemon - Guest agent and host listener
//!
//! This crate provides:
//! - The newline-delimited JSON wire protocol
//! - Transports for reaching the listener (vsock, Unix, TCP) and for
//!   receiving a socket-activated stream
//! - The guest agent that registers and streams root changes
//! - The host listener that mirrors a guest's roots for the local collector

pub mod agent;
pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod notify;
pub mod report;
pub mod transport;
pub mod wire;

pub use agent::{Agent, AgentState};
pub use config::{AgentConfig, ListenerConfig};
pub use error::{DaemonError, Result};
pub use listener::{Listener, ListenerState};
pub use notify::{NoopNotifier, Notifier, SystemdNotifier};
pub use report::TracingReporter;
pub use transport::Endpoint;
pub use wire::{Message, MessageReader, MessageWriter};
