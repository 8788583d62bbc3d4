//! Root registry scanning
//!
//! Walks the guest's GC root directory and produces a [`Snapshot`] of every
//! root that currently resolves into the store.

use std::path::Path;
use walkdir::WalkDir;

use crate::report::{Reporter, SkipReason};
use crate::resolver::{resolve, Resolution};
use crate::types::Snapshot;

/// Scan `registry` recursively and resolve every symlink found in it.
///
/// Links are never followed during the walk. Roots that fail to resolve are
/// left out, so stale entries disappear on the next scan by themselves. A
/// missing registry yields an empty snapshot.
pub fn scan(store: &Path, registry: &Path, reporter: &dyn Reporter) -> Snapshot {
    let mut snapshot = Snapshot::new();

    for entry in WalkDir::new(registry).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(registry).to_path_buf();
                if let Some(io) = e.into_io_error() {
                    if io.kind() != std::io::ErrorKind::NotFound {
                        reporter.root_skipped(&path, &SkipReason::Unreadable(io));
                    }
                }
                continue;
            }
        };

        if !entry.path_is_symlink() {
            continue;
        }

        let root = entry.path();
        let target = match resolve(store, root) {
            Resolution::Store(target) => target,
            Resolution::Invalid => {
                reporter.root_skipped(root, &SkipReason::Unresolved);
                continue;
            }
        };

        if root.to_str().is_none() || target.to_str().is_none() {
            reporter.root_skipped(root, &SkipReason::NotUtf8);
            continue;
        }

        snapshot.insert(root.to_path_buf(), target);
    }

    snapshot
}
