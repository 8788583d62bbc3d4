//! Host-side mirror of a guest's roots
//!
//! Each mirrored root becomes a symlink in `<mirror_root>/<guest id>/` named
//! by the SHA-256 of the guest root path and pointing at the store target.
//! The directory is shared with the host's garbage collector, so every
//! mutation of a single entry is one atomic filesystem operation: link
//! replacement goes through `rename`, and removal tolerates absence.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{CoreError, Result};
use crate::report::Reporter;
use crate::store::is_store_descendant;
use crate::types::{GuestId, RootPair};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Mirror entry name for a guest root: lowercase hex SHA-256 of its path string
pub fn entry_name(root: &Path) -> String {
    hex::encode(Sha256::digest(root.to_string_lossy().as_bytes()))
}

/// The mirror directory of one guest
#[derive(Debug, Clone)]
pub struct Mirror {
    dir: PathBuf,
    store: PathBuf,
}

impl Mirror {
    /// Open the mirror for `guest` under `mirror_root`, creating its directory
    pub fn open(mirror_root: &Path, store: &Path, guest: &GuestId) -> Result<Self> {
        let dir = mirror_root.join(guest.to_hex());
        fs::create_dir_all(&dir).map_err(|e| CoreError::at(&dir, e))?;
        Ok(Self {
            dir,
            store: store.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(&self) -> &Path {
        &self.store
    }

    /// Whether `register` would write an entry pointing at `target`
    pub fn admits(&self, target: &Path) -> bool {
        is_store_descendant(&self.store, target)
    }

    /// Path of the entry that mirrors `root`
    pub fn entry_path(&self, root: &Path) -> PathBuf {
        self.dir.join(entry_name(root))
    }

    /// Remove every existing entry, returning how many were removed.
    ///
    /// Entries that vanish underneath us (the collector got there first) are
    /// not an error.
    pub fn clear(&self, reporter: &dyn Reporter) -> Result<usize> {
        let entries = fs::read_dir(&self.dir).map_err(|e| CoreError::at(&self.dir, e))?;
        let mut removed = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(CoreError::at(&self.dir, e)),
            };
            let path = entry.path();
            if remove_if_present(&path)? {
                reporter.entry_cleared(&path);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Create or replace an entry for every pair whose target lies in the store.
    ///
    /// Pairs pointing elsewhere are reported and skipped without touching the
    /// filesystem; the remaining pairs are still applied. Returns the number
    /// of entries written.
    pub fn register<'a, I>(&self, pairs: I, reporter: &dyn Reporter) -> Result<usize>
    where
        I: IntoIterator<Item = &'a RootPair>,
    {
        let mut written = 0;
        for pair in pairs {
            if !self.admits(pair.target()) {
                reporter.policy_violation(pair.root(), pair.target(), &self.store);
                continue;
            }
            let entry = self.entry_path(pair.root());
            self.replace_link(&entry, pair.target())?;
            reporter.entry_registered(&entry, pair.target());
            written += 1;
        }
        Ok(written)
    }

    /// Remove the entries for the given roots; absent entries are ignored.
    ///
    /// Returns the number of entries actually removed.
    pub fn unregister<'a, I>(&self, roots: I, reporter: &dyn Reporter) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut removed = 0;
        for root in roots {
            let entry = self.entry_path(root);
            if remove_if_present(&entry)? {
                reporter.entry_removed(&entry);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Atomically point `entry` at `target`, replacing any previous link
    fn replace_link(&self, entry: &Path, target: &Path) -> Result<()> {
        let temp = self.dir.join(format!(
            ".tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        // A leftover from a crashed run with a recycled pid would block symlink()
        remove_if_present(&temp)?;
        symlink(target, &temp).map_err(|e| CoreError::at(&temp, e))?;
        if let Err(e) = fs::rename(&temp, entry) {
            let _ = fs::remove_file(&temp);
            return Err(CoreError::at(entry, e));
        }
        Ok(())
    }
}

/// Remove a link, returning false if it was already gone
fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CoreError::at(path, e)),
    }
}
