//! vmroots Core - Guest GC root tracking primitives
//!
//! This crate provides the filesystem logic shared by the guest agent and the
//! host listener:
//! - Resolving a root's symlink chain into the store
//! - Scanning a root registry into a snapshot
//! - Differencing snapshots into added/removed pairs
//! - Maintaining the host-side mirror directory of a guest

pub mod diff;
pub mod error;
pub mod mirror;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod store;
pub mod types;

pub use diff::diff;
pub use error::{CoreError, Result};
pub use mirror::{entry_name, Mirror};
pub use report::{NullReporter, Reporter, SkipReason};
pub use resolver::{resolve, Resolution, MAX_LINK_HOPS};
pub use scanner::scan;
pub use store::is_store_descendant;
pub use types::{ChangeSet, GuestId, RootPair, Snapshot};

/// Default location of the store
pub const DEFAULT_STORE_DIR: &str = "/nix/store";

/// Default guest root registry
pub const DEFAULT_GCROOTS_DIR: &str = "/nix/var/nix/gcroots";

/// Default host directory holding one mirror directory per guest
pub const DEFAULT_MIRROR_ROOT: &str = "/nix/var/nix/gcroots/per-vm";
