//! Listener input selection
//!
//! Socket activation passes the accepted connection as the first listen
//! descriptor. Without activation the listener reads standard input, which
//! also makes it usable behind inetd style wrappers or a plain pipe.

use std::io;
use std::os::unix::io::{FromRawFd, RawFd};
use tokio::io::AsyncRead;

/// Where the listener reads its message stream from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerInput {
    /// Descriptor handed over by the service manager
    Activated(RawFd),
    /// Standard input
    Stdin,
}

impl ListenerInput {
    /// Open the input as an async byte stream
    pub fn open(self) -> Box<dyn AsyncRead + Send + Unpin> {
        match self {
            ListenerInput::Activated(fd) => {
                // SAFETY: the service manager transfers ownership of this
                // descriptor to us and `listener_input` hands it out once.
                let file = unsafe { std::fs::File::from_raw_fd(fd) };
                Box::new(tokio::fs::File::from_std(file))
            }
            ListenerInput::Stdin => Box::new(tokio::io::stdin()),
        }
    }
}

/// Pick the activated socket when one was passed to this process, else stdin.
///
/// The activation variables are consumed and removed from the environment.
/// Malformed activation variables are an error rather than a silent fallback.
pub fn listener_input() -> io::Result<ListenerInput> {
    let mut fds = sd_notify::listen_fds()?;
    Ok(fds
        .next()
        .map(ListenerInput::Activated)
        .unwrap_or(ListenerInput::Stdin))
}
