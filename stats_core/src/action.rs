//! Action identities
//!
//! An [`ActionId`] names an ability, item or engine-level action. Metrics,
//! auras and cooldowns are all keyed by values derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-level actions that are neither spells nor items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtherAction {
    MeleeSwing,
    RangedShot,
    ResourceRegen,
    Wait,
}

/// What kind of thing an action refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    #[default]
    Empty,
    Spell(i32),
    Item(i32),
    Other(OtherAction),
}

/// Unique identity of an ability, item or effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActionId {
    pub source: ActionSource,
    /// Disambiguates variants of the same action (e.g. ranks, hit kinds)
    #[serde(default)]
    pub tag: i32,
}

impl ActionId {
    pub const fn spell(id: i32) -> Self {
        ActionId {
            source: ActionSource::Spell(id),
            tag: 0,
        }
    }

    pub const fn item(id: i32) -> Self {
        ActionId {
            source: ActionSource::Item(id),
            tag: 0,
        }
    }

    pub const fn other(action: OtherAction) -> Self {
        ActionId {
            source: ActionSource::Other(action),
            tag: 0,
        }
    }

    /// Same action with a different tag
    pub const fn with_tag(self, tag: i32) -> Self {
        ActionId {
            source: self.source,
            tag,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source == ActionSource::Empty
    }

    pub fn is_spell(&self, id: i32) -> bool {
        self.source == ActionSource::Spell(id)
    }

    pub fn is_item(&self, id: i32) -> bool {
        self.source == ActionSource::Item(id)
    }

    /// Compare ignoring the disambiguation tag
    pub fn same_action_ignore_tag(&self, other: &ActionId) -> bool {
        self.source == other.source
    }

    /// Compare including the disambiguation tag
    pub fn same_action(&self, other: &ActionId) -> bool {
        self == other
    }

    /// Collision-free key for metric tables
    pub fn key(&self) -> ActionKey {
        ActionKey::from(*self)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        match self.source {
            ActionSource::Empty => write!(f, "Empty")?,
            ActionSource::Spell(id) => write!(f, "SpellID: {}", id)?,
            ActionSource::Item(id) => write!(f, "ItemID: {}", id)?,
            ActionSource::Other(other) => write!(f, "OtherID: {:?}", other)?,
        }
        if self.tag != 0 {
            write!(f, ", Tag: {}", self.tag)?;
        }
        write!(f, "}}")
    }
}

/// Ordered key derived from an [`ActionId`]
///
/// Spell, item and other ids live in separate namespaces so equal numeric ids
/// of different kinds never collide. The tag is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionKey {
    kind: u8,
    id: i32,
    tag: i32,
}

impl From<ActionId> for ActionKey {
    fn from(action: ActionId) -> Self {
        let (kind, id) = match action.source {
            ActionSource::Empty => (0, 0),
            ActionSource::Spell(id) => (1, id),
            ActionSource::Item(id) => (2, id),
            ActionSource::Other(other) => (3, other as i32),
        };
        ActionKey {
            kind,
            id,
            tag: action.tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_do_not_collide_across_kinds() {
        let keys: HashSet<ActionKey> = [
            ActionId::spell(3),
            ActionId::item(3),
            ActionId::other(OtherAction::Wait),
            ActionId::spell(3).with_tag(1),
        ]
        .iter()
        .map(|a| a.key())
        .collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_same_action_ignores_tag_only_when_asked() {
        let a = ActionId::spell(27016);
        let b = a.with_tag(2);
        assert!(a.same_action_ignore_tag(&b));
        assert!(!a.same_action(&b));
    }

    #[test]
    fn test_display() {
        assert_eq!(ActionId::spell(42).to_string(), "{SpellID: 42}");
        assert_eq!(ActionId::item(7).with_tag(1).to_string(), "{ItemID: 7, Tag: 1}");
    }

    #[test]
    fn test_empty() {
        assert!(ActionId::default().is_empty());
        assert!(!ActionId::spell(1).is_empty());
    }
}
