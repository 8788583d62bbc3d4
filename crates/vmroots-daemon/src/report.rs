//! `tracing` backed event reporting

use std::path::Path;
use tracing::{debug, warn};

use vmroots_core::{Reporter, SkipReason};

/// Forwards core events to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn root_skipped(&self, root: &Path, reason: &SkipReason) {
        match reason {
            SkipReason::Unresolved => debug!("Skipping root {:?}: does not resolve into the store", root),
            SkipReason::NotUtf8 => debug!("Skipping root {:?}: path is not valid UTF-8", root),
            SkipReason::Unreadable(e) => warn!("Skipping {:?}: {}", root, e),
        }
    }

    fn policy_violation(&self, root: &Path, target: &Path, store: &Path) {
        warn!(
            "GC root {:?} points at {:?} outside store path {:?}; ignoring",
            root, target, store
        );
    }

    fn entry_registered(&self, entry: &Path, target: &Path) {
        debug!("Registered root {:?} -> {:?}", entry, target);
    }

    fn entry_removed(&self, entry: &Path) {
        debug!("Deleted root {:?}", entry);
    }

    fn entry_cleared(&self, entry: &Path) {
        debug!("Cleared previous root {:?}", entry);
    }
}
