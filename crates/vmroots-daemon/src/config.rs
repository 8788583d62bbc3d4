//! Agent and listener configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use vmroots_core::{GuestId, DEFAULT_GCROOTS_DIR, DEFAULT_MIRROR_ROOT, DEFAULT_STORE_DIR};

use crate::error::{DaemonError, Result};
use crate::transport::Endpoint;

/// Default polling interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Guest-side agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Identity announced to the listener
    pub guest_id: Option<GuestId>,

    /// Path to the store
    pub store_dir: PathBuf,

    /// Root registry to scan
    pub gcroots_dir: PathBuf,

    /// Seconds between scans
    pub interval_secs: u64,

    /// Listener to report to
    pub endpoint: Endpoint,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            guest_id: None,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            gcroots_dir: PathBuf::from(DEFAULT_GCROOTS_DIR),
            interval_secs: DEFAULT_INTERVAL_SECS,
            endpoint: Endpoint::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Check the configuration and return the guest identity it names
    pub fn validate(&self) -> Result<GuestId> {
        let guest_id = self
            .guest_id
            .ok_or_else(|| DaemonError::Config("guest id is required".to_string()))?;
        if self.interval_secs == 0 {
            return Err(DaemonError::Config("interval must be at least 1s".to_string()));
        }
        require_absolute("store_dir", &self.store_dir)?;
        require_absolute("gcroots_dir", &self.gcroots_dir)?;
        Ok(guest_id)
    }
}

/// Host-side listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Path to the store; mirrored targets must live below it
    pub store_dir: PathBuf,

    /// Directory holding one mirror directory per guest
    pub mirror_root: PathBuf,

    /// Report readiness and shutdown to the service manager
    pub notify: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            mirror_root: PathBuf::from(DEFAULT_MIRROR_ROOT),
            notify: true,
        }
    }
}

impl ListenerConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn validate(&self) -> Result<()> {
        require_absolute("store_dir", &self.store_dir)?;
        require_absolute("mirror_root", &self.mirror_root)?;
        Ok(())
    }

    /// Replace configured paths by their canonical form where they exist.
    ///
    /// Targets sent by guests are compared lexically against the store path,
    /// so a store reached through a symlink must be spelled canonically.
    pub fn canonicalize(&mut self) -> Result<()> {
        for path in [&mut self.store_dir, &mut self.mirror_root] {
            match path.canonicalize() {
                Ok(canonical) => *path = canonical,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DaemonError::Config(format!("Failed to read {:?}: {}", path, e)))?;
    serde_json::from_str(&content)
        .map_err(|e| DaemonError::Config(format!("Failed to parse {:?}: {}", path, e)))
}

fn require_absolute(name: &str, path: &Path) -> Result<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(DaemonError::Config(format!(
            "{} must be an absolute path, got {:?}",
            name, path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_agent_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.store_dir, PathBuf::from("/nix/store"));
        assert_eq!(config.interval(), Duration::from_secs(300));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_agent_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent.json");
        std::fs::write(
            &path,
            r#"{"guest_id":"6b29fc40ca471067b31d00dd010662da","interval_secs":5,"endpoint":"unix:/run/roots.sock"}"#,
        )
        .unwrap();

        let config = AgentConfig::load(&path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval_secs, 5);
        assert_eq!(config.gcroots_dir, PathBuf::from("/nix/var/nix/gcroots"));
        assert_eq!(config.endpoint, Endpoint::Unix(PathBuf::from("/run/roots.sock")));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = AgentConfig {
            guest_id: Some(GuestId::from_bytes([7; 16])),
            interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_listener_rejects_relative_paths() {
        let config = ListenerConfig {
            mirror_root: PathBuf::from("per-vm"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ListenerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_listener_canonicalize_keeps_missing_paths() {
        let dir = TempDir::new().unwrap();
        let mut config = ListenerConfig {
            store_dir: dir.path().join("missing-store"),
            mirror_root: dir.path().to_path_buf(),
            notify: false,
        };
        config.canonicalize().unwrap();
        assert_eq!(config.store_dir, dir.path().join("missing-store"));
        assert_eq!(config.mirror_root, dir.path().canonicalize().unwrap());
    }
}
