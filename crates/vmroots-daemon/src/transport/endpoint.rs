//! Remote endpoint addressing

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{DaemonError, Result};

use super::connection::{BoxedStream, ClientTransport};
use super::tcp::TcpConnector;
use super::unix::UnixConnector;
use super::vsock::VsockConnector;

/// Default hypervisor host CID
pub const DEFAULT_VSOCK_CID: u32 = 2;

/// Default listener port
pub const DEFAULT_VSOCK_PORT: u32 = 25565;

/// Where the agent sends its updates.
///
/// Textual forms: `vsock:<cid>:<port>`, `unix:<path>`, `tcp:<host>:<port>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Vsock { cid: u32, port: u32 },
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Vsock {
            cid: DEFAULT_VSOCK_CID,
            port: DEFAULT_VSOCK_PORT,
        }
    }
}

impl Endpoint {
    /// Establish a connection; a failure here is fatal for the agent
    pub async fn connect(&self) -> Result<BoxedStream> {
        let stream: BoxedStream = match self {
            Endpoint::Vsock { cid, port } => {
                Box::new(VsockConnector::new(*cid, *port).connect().await?)
            }
            Endpoint::Unix(path) => Box::new(UnixConnector::new(path.clone()).connect().await?),
            Endpoint::Tcp { host, port } => {
                Box::new(TcpConnector::new(host.clone(), *port).connect().await?)
            }
        };
        Ok(stream)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Vsock { cid, port } => write!(f, "vsock:{}:{}", cid, port),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp { host, port } => write!(f, "tcp:{}:{}", host, port),
        }
    }
}

impl FromStr for Endpoint {
    type Err = DaemonError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| DaemonError::Config(format!("Invalid endpoint {:?}: {}", s, why));

        let (scheme, rest) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected <scheme>:<address>"))?;

        match scheme {
            "vsock" => {
                let (cid, port) = rest
                    .split_once(':')
                    .ok_or_else(|| invalid("expected vsock:<cid>:<port>"))?;
                Ok(Endpoint::Vsock {
                    cid: cid.parse().map_err(|_| invalid("bad cid"))?,
                    port: port.parse().map_err(|_| invalid("bad port"))?,
                })
            }
            "unix" => {
                if rest.is_empty() {
                    return Err(invalid("empty socket path"));
                }
                Ok(Endpoint::Unix(PathBuf::from(rest)))
            }
            "tcp" => {
                let (host, port) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("expected tcp:<host>:<port>"))?;
                let host = host.trim_start_matches('[').trim_end_matches(']');
                if host.is_empty() {
                    return Err(invalid("empty host"));
                }
                Ok(Endpoint::Tcp {
                    host: host.to_string(),
                    port: port.parse().map_err(|_| invalid("bad port"))?,
                })
            }
            other => Err(invalid(&format!("unknown scheme {:?}", other))),
        }
    }
}

impl Serialize for Endpoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            "vsock:2:25565".parse::<Endpoint>().unwrap(),
            Endpoint::Vsock { cid: 2, port: 25565 }
        );
        assert_eq!(
            "unix:/run/vmroots.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("/run/vmroots.sock"))
        );
        assert_eq!(
            "tcp:[::1]:7000".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp {
                host: "::1".to_string(),
                port: 7000
            }
        );
    }

    #[test]
    fn test_display_roundtrips() {
        for text in ["vsock:3:1024", "unix:/tmp/x.sock", "tcp:host:80"] {
            assert_eq!(text.parse::<Endpoint>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_rejects_garbage() {
        for text in ["", "vsock:2", "vsock:x:1", "tcp:host", "unix:", "udp:1:2", "tcp::80"] {
            assert!(text.parse::<Endpoint>().is_err(), "{:?} should fail", text);
        }
    }

    #[test]
    fn test_default_is_host_cid() {
        assert_eq!(Endpoint::default().to_string(), "vsock:2:25565");
    }
}
