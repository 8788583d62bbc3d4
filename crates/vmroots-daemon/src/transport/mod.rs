//! Stream transports
//!
//! The agent dials an [`Endpoint`]; the listener reads from a stream that
//! the service manager hands over, or from standard input.

mod activation;
mod connection;
mod endpoint;
mod tcp;
mod unix;
mod vsock;

pub use activation::{listener_input, ListenerInput};
pub use connection::{BoxedStream, ClientTransport, DuplexStream};
pub use endpoint::{Endpoint, DEFAULT_VSOCK_CID, DEFAULT_VSOCK_PORT};
pub use tcp::TcpConnector;
pub use unix::UnixConnector;
pub use vsock::VsockConnector;
