//! Unix domain socket transport

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::net::UnixStream;

use crate::error::{DaemonError, Result};

use super::connection::ClientTransport;

/// Connects to a listener behind a Unix domain socket
pub struct UnixConnector {
    path: PathBuf,
}

impl UnixConnector {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ClientTransport for UnixConnector {
    type Stream = UnixStream;

    async fn connect(&self) -> Result<Self::Stream> {
        UnixStream::connect(&self.path).await.map_err(|e| {
            DaemonError::Transport(format!("Failed to connect to {:?}: {}", self.path, e))
        })
    }
}
