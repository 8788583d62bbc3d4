//! Core data model shared by the agent and the listener

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// Identity of the guest whose roots are being mirrored (128 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuestId(Uuid);

impl GuestId {
    /// Create a GuestId from a UUID
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a GuestId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Canonical rendering: 32 lowercase hex characters, no separators
    pub fn to_hex(&self) -> String {
        self.0.simple().to_string()
    }

    /// Parse any textual UUID form (simple, hyphenated, braced, urn)
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CoreError::InvalidGuestId(format!("{:?}: {}", s, e)))
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for GuestId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for GuestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for GuestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A root link together with the store path it resolves to.
///
/// Serialized as a two element array `[root, target]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RootPair(pub PathBuf, pub PathBuf);

impl RootPair {
    pub fn new(root: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self(root.into(), target.into())
    }

    /// The root link path on the guest
    pub fn root(&self) -> &Path {
        &self.0
    }

    /// The store path kept alive by the root
    pub fn target(&self) -> &Path {
        &self.1
    }
}

impl fmt::Display for RootPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.0.display(), self.1.display())
    }
}

/// Every currently valid root and its resolved store path, as seen by one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    roots: BTreeMap<PathBuf, PathBuf>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a root, returning the target it previously pointed at
    pub fn insert(&mut self, root: PathBuf, target: PathBuf) -> Option<PathBuf> {
        self.roots.insert(root, target)
    }

    pub fn remove(&mut self, root: &Path) -> Option<PathBuf> {
        self.roots.remove(root)
    }

    pub fn get(&self, root: &Path) -> Option<&Path> {
        self.roots.get(root).map(PathBuf::as_path)
    }

    /// Whether `root` is present and resolves to exactly `target`
    pub fn contains_pair(&self, root: &Path, target: &Path) -> bool {
        self.get(root) == Some(target)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Iterate over (root, target) in root order
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.roots
            .iter()
            .map(|(root, target)| (root.as_path(), target.as_path()))
    }

    /// All entries as an explicit pair list, in root order
    pub fn pairs(&self) -> Vec<RootPair> {
        self.roots
            .iter()
            .map(|(root, target)| RootPair(root.clone(), target.clone()))
            .collect()
    }

    /// Apply a change set the way the listener does: removals first, then additions
    pub fn apply(&mut self, changes: &ChangeSet) {
        for pair in &changes.removed {
            self.roots.remove(pair.root());
        }
        for pair in &changes.added {
            self.roots.insert(pair.0.clone(), pair.1.clone());
        }
    }
}

impl FromIterator<RootPair> for Snapshot {
    fn from_iter<I: IntoIterator<Item = RootPair>>(iter: I) -> Self {
        Self {
            roots: iter.into_iter().map(|pair| (pair.0, pair.1)).collect(),
        }
    }
}

/// Pairs added and removed between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<RootPair>,
    pub removed: Vec<RootPair>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Total number of pairs carried
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}
