//! Store path policy
//!
//! Decides lexically whether a path lies strictly below the store root.
//! No filesystem access: mirrored targets usually do not exist on the
//! listener side until the store is shared, and the decision must not be
//! swayed by symlinks an attacker controls.

use std::path::{Component, Path};

/// Returns true when `path` is a strict descendant of `store`.
///
/// `path` must be absolute, start with every component of `store`, have at
/// least one further component, and contain no `.` or `..` after the prefix.
pub fn is_store_descendant(store: &Path, path: &Path) -> bool {
    if !path.is_absolute() {
        return false;
    }
    let rest = match path.strip_prefix(store) {
        Ok(rest) => rest,
        Err(_) => return false,
    };
    let mut components = rest.components().peekable();
    if components.peek().is_none() {
        return false;
    }
    components.all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendant() {
        let store = Path::new("/nix/store");
        assert!(is_store_descendant(store, Path::new("/nix/store/xxx-a")));
        assert!(is_store_descendant(store, Path::new("/nix/store/xxx-a/bin/sh")));
    }

    #[test]
    fn test_store_itself_is_not_a_descendant() {
        let store = Path::new("/nix/store");
        assert!(!is_store_descendant(store, Path::new("/nix/store")));
        assert!(!is_store_descendant(store, Path::new("/nix/store/")));
    }

    #[test]
    fn test_outside_paths_rejected() {
        let store = Path::new("/nix/store");
        assert!(!is_store_descendant(store, Path::new("/etc/passwd")));
        assert!(!is_store_descendant(store, Path::new("/nix/store-evil/x")));
        assert!(!is_store_descendant(store, Path::new("nix/store/x")));
    }

    #[test]
    fn test_parent_components_rejected() {
        let store = Path::new("/nix/store");
        assert!(!is_store_descendant(store, Path::new("/nix/store/../../etc/passwd")));
        assert!(!is_store_descendant(store, Path::new("/nix/store/x/../../y")));
    }
}
