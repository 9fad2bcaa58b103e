// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Causation identifiers.
//!
//! Every command sent by an adapter carries a [`CausationId`]. The host
//! echoes it back on the state changes the command produced, which lets the
//! manual-control tracker tell self-caused changes from external ones.

use std::fmt;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

/// Where a causation identifier was minted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Origin {
    /// Created outside this library (a user, an automation, a wall switch).
    External,
    /// Created by an adapter instance.
    Adapter {
        /// Name of the adapter that issued the command.
        instance: String,
        /// What triggered the command (`interval`, `service`, ...).
        trigger: String,
        /// Per-adapter sequence number.
        sequence: u64,
    },
}

/// Opaque identifier correlating a command with the state changes it caused.
///
/// Two identifiers are equal when their UUIDs are equal; origin and parent
/// are metadata and never take part in comparisons.
///
/// # Examples
///
/// ```
/// use sunlight_lib::types::CausationId;
///
/// let external = CausationId::external();
/// assert!(!external.is_self_originated());
///
/// let ours = CausationId::adapter("living_room", "interval", 7, None);
/// assert!(ours.is_self_originated());
/// assert_ne!(ours, external);
/// ```
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct CausationId {
    id: Uuid,
    origin: Origin,
    parent: Option<Uuid>,
}

impl CausationId {
    /// Creates an identifier for a change that did not come from an adapter.
    #[must_use]
    pub fn external() -> Self {
        Self {
            id: Uuid::new_v4(),
            origin: Origin::External,
            parent: None,
        }
    }

    /// Creates an identifier for a command issued by an adapter.
    #[must_use]
    pub fn adapter(
        instance: impl Into<String>,
        trigger: impl Into<String>,
        sequence: u64,
        parent: Option<&CausationId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin: Origin::Adapter {
                instance: instance.into(),
                trigger: trigger.into(),
                sequence,
            },
            parent: parent.map(|p| p.id),
        }
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the origin tag.
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns the identifier of the causation that triggered this one.
    #[must_use]
    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    /// Returns `true` if an adapter minted this identifier.
    #[must_use]
    pub fn is_self_originated(&self) -> bool {
        matches!(self.origin, Origin::Adapter { .. })
    }
}

impl PartialEq for CausationId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CausationId {}

impl Hash for CausationId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for CausationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CausationId({self})")
    }
}

impl fmt::Display for CausationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Origin::External => write!(f, "ext_{}", &self.id.simple().to_string()[..8]),
            Origin::Adapter {
                instance,
                trigger,
                sequence,
            } => write!(f, "{instance}_{trigger}_{sequence}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_metadata() {
        let a = CausationId::adapter("a", "interval", 1, None);
        let mut b = a.clone();
        b.origin = Origin::External;
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_ids_differ() {
        let a = CausationId::adapter("a", "interval", 1, None);
        let b = CausationId::adapter("a", "interval", 1, None);
        assert_ne!(a, b);
    }

    #[test]
    fn parent_is_recorded() {
        let parent = CausationId::external();
        let child = CausationId::adapter("a", "service", 3, Some(&parent));
        assert_eq!(child.parent(), Some(parent.id()));
    }

    #[test]
    fn display_format() {
        let id = CausationId::adapter("desk", "turn_on", 12, None);
        assert_eq!(id.to_string(), "desk_turn_on_12");
        assert!(CausationId::external().to_string().starts_with("ext_"));
    }
}
