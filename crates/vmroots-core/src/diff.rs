//! Snapshot differencing

use crate::types::{ChangeSet, RootPair, Snapshot};

/// Compute the pairs added and removed between `previous` and `current`.
///
/// Pairs are compared whole: a root whose target changed shows up once in
/// `removed` (old target) and once in `added` (new target). Both lists are
/// ordered by root path.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> ChangeSet {
    let added = current
        .iter()
        .filter(|(root, target)| !previous.contains_pair(root, target))
        .map(|(root, target)| RootPair::new(root, target))
        .collect();

    let removed = previous
        .iter()
        .filter(|(root, target)| !current.contains_pair(root, target))
        .map(|(root, target)| RootPair::new(root, target))
        .collect();

    ChangeSet { added, removed }
}
