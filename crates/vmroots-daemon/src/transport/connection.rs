//! Transport abstraction

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// A connected duplex byte stream
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> DuplexStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Type-erased stream handed to the agent
pub type BoxedStream = Box<dyn DuplexStream>;

/// Client-side transport trait
#[async_trait]
pub trait ClientTransport: Send + Sync {
    /// The stream type for this transport
    type Stream: DuplexStream;

    /// Connect to the remote listener
    async fn connect(&self) -> Result<Self::Stream>;
}
