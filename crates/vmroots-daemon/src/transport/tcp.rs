//! TCP transport

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::{DaemonError, Result};

use super::connection::ClientTransport;

/// Connects to a listener over TCP
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

#[async_trait]
impl ClientTransport for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<Self::Stream> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                DaemonError::Transport(format!(
                    "Failed to connect to {}:{}: {}",
                    self.host, self.port, e
                ))
            })?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
