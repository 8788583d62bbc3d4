//! Root link resolution
//!
//! Follows a root's symlink chain one hop at a time until it lands under the
//! store root. Each hop is read with `readlink`, never with full path
//! resolution, so intermediate links outside the store (profiles,
//! generations, per-user indirections) are walked explicitly.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::store::is_store_descendant;

/// Upper bound on links followed for a single root (Linux `MAXSYMLINKS`)
pub const MAX_LINK_HOPS: usize = 40;

/// Outcome of resolving a root link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The chain reached this path below the store root
    Store(PathBuf),
    /// Dangling, cyclic, too long, or never reaches the store
    Invalid,
}

impl Resolution {
    pub fn store_path(self) -> Option<PathBuf> {
        match self {
            Resolution::Store(path) => Some(path),
            Resolution::Invalid => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Resolution::Invalid)
    }
}

/// Resolve `link` to the store path it keeps alive.
///
/// A path already below `store` resolves to itself without touching the
/// filesystem. Otherwise `link` is dereferenced one level, and so is every
/// following path that is not below `store`. Any read failure (the path is
/// missing, or is not a link) makes the root invalid.
pub fn resolve(store: &Path, link: &Path) -> Resolution {
    if is_store_descendant(store, link) {
        return Resolution::Store(link.to_path_buf());
    }

    let mut current = match read_hop(link) {
        Some(path) => path,
        None => return Resolution::Invalid,
    };
    let mut hops = 1;

    while !is_store_descendant(store, &current) {
        if hops >= MAX_LINK_HOPS {
            return Resolution::Invalid;
        }
        current = match read_hop(&current) {
            Some(path) => path,
            None => return Resolution::Invalid,
        };
        hops += 1;
    }

    Resolution::Store(current)
}

/// Read one link, anchoring relative targets at the link's directory
fn read_hop(link: &Path) -> Option<PathBuf> {
    let target = fs::read_link(link).ok()?;
    if target.is_absolute() {
        return Some(normalize(&target));
    }
    let base = link.parent().unwrap_or_else(|| Path::new("/"));
    Some(normalize(&base.join(target)))
}

/// Lexically drop `.` and fold `..` into the preceding component
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
