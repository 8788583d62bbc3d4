//! Wire message types

use serde::{Deserialize, Serialize};
use vmroots_core::{ChangeSet, GuestId, RootPair};

/// A single protocol message, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Opens a session with the guest's full root set
    #[serde(rename = "init")]
    Registration { id: GuestId, roots: Vec<RootPair> },

    /// Differential update relative to everything sent before
    #[serde(rename = "update")]
    Update {
        added: Vec<RootPair>,
        removed: Vec<RootPair>,
    },
}

impl Message {
    /// Wire name of the message kind
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Registration { .. } => "init",
            Message::Update { .. } => "update",
        }
    }
}

impl From<ChangeSet> for Message {
    fn from(changes: ChangeSet) -> Self {
        Message::Update {
            added: changes.added,
            removed: changes.removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUEST: &str = "6b29fc40ca471067b31d00dd010662da";

    #[test]
    fn test_registration_shape() {
        let msg = Message::Registration {
            id: GUEST.parse().unwrap(),
            roots: vec![RootPair::new("/gcroots/a", "/nix/store/xxx-a")],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"init","id":"6b29fc40ca471067b31d00dd010662da","roots":[["/gcroots/a","/nix/store/xxx-a"]]}"#
        );
    }

    #[test]
    fn test_update_shape() {
        let msg = Message::from(ChangeSet {
            added: vec![RootPair::new("/gcroots/a", "/nix/store/yyy-a")],
            removed: vec![RootPair::new("/gcroots/a", "/nix/store/xxx-a")],
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"update","added":[["/gcroots/a","/nix/store/yyy-a"]],"removed":[["/gcroots/a","/nix/store/xxx-a"]]}"#
        );
    }

    #[test]
    fn test_hyphenated_id_accepted() {
        let json = r#"{"type":"init","id":"6b29fc40-ca47-1067-b31d-00dd010662da","roots":[]}"#;
        match serde_json::from_str::<Message>(json).unwrap() {
            Message::Registration { id, roots } => {
                assert_eq!(id.to_hex(), GUEST);
                assert!(roots.is_empty());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_kind_and_missing_fields() {
        assert!(serde_json::from_str::<Message>(r#"{"type":"bye"}"#).is_err());
        assert!(serde_json::from_str::<Message>(r#"{"type":"update","added":[]}"#).is_err());
        assert!(serde_json::from_str::<Message>(r#"{"id":"x","roots":[]}"#).is_err());
        assert!(
            serde_json::from_str::<Message>(r#"{"type":"update","added":[["/a"]],"removed":[]}"#)
                .is_err()
        );
    }
}
