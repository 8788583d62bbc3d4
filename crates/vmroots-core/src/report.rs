//! Event reporting
//!
//! Core operations handle recoverable conditions locally and describe them
//! to a [`Reporter`] supplied by the caller instead of a global logger.

use std::io;
use std::path::Path;

/// Why a root was left out of a snapshot
#[derive(Debug)]
pub enum SkipReason {
    /// The link chain ends at a missing path or never reaches the store
    Unresolved,
    /// The root or its target cannot be represented as UTF-8
    NotUtf8,
    /// The registry walk could not read an entry
    Unreadable(io::Error),
}

/// Receiver for events raised by scanning and mirroring
pub trait Reporter {
    /// A registry entry was excluded from the snapshot
    fn root_skipped(&self, _root: &Path, _reason: &SkipReason) {}

    /// A remote pair pointed outside the store and was ignored
    fn policy_violation(&self, _root: &Path, _target: &Path, _store: &Path) {}

    /// A mirror entry was created or replaced
    fn entry_registered(&self, _entry: &Path, _target: &Path) {}

    /// A mirror entry was removed in response to an update
    fn entry_removed(&self, _entry: &Path) {}

    /// A stale mirror entry was removed while resetting the guest directory
    fn entry_cleared(&self, _entry: &Path) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}
