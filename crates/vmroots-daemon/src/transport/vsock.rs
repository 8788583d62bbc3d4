//! VM socket transport (Linux)

use async_trait::async_trait;

use crate::error::{DaemonError, Result};

use super::connection::ClientTransport;

/// Connects to a listener on another VM or the hypervisor host
pub struct VsockConnector {
    cid: u32,
    port: u32,
}

impl VsockConnector {
    pub fn new(cid: u32, port: u32) -> Self {
        Self { cid, port }
    }
}

#[cfg(all(target_os = "linux", feature = "vsock"))]
#[async_trait]
impl ClientTransport for VsockConnector {
    type Stream = tokio_vsock::VsockStream;

    async fn connect(&self) -> Result<Self::Stream> {
        let addr = tokio_vsock::VsockAddr::new(self.cid, self.port);
        tokio_vsock::VsockStream::connect(addr).await.map_err(|e| {
            DaemonError::Transport(format!(
                "Failed to connect to vsock {}:{}: {}",
                self.cid, self.port, e
            ))
        })
    }
}

#[cfg(not(all(target_os = "linux", feature = "vsock")))]
#[async_trait]
impl ClientTransport for VsockConnector {
    type Stream = tokio::net::UnixStream;

    async fn connect(&self) -> Result<Self::Stream> {
        Err(DaemonError::Transport(format!(
            "vsock {}:{} requested but vsock support is not built in",
            self.cid, self.port
        )))
    }
}
