//! Team domain types
//!
//! Exactly two teams exist. Each is backed by a guild role; membership
//! counts are never stored here, they are read from the gateway on demand.

use twilight_model::id::marker::{RoleMarker, UserMarker};
use twilight_model::id::Id;

/// Which of the two fixed teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamSlot {
    A,
    B,
}

impl TeamSlot {
    /// Label used in metrics
    pub fn label(self) -> &'static str {
        match self {
            TeamSlot::A => "a",
            TeamSlot::B => "b",
        }
    }
}

/// A team and the role that tags its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub slot: TeamSlot,
    pub role_id: Id<RoleMarker>,
    pub name: String,
    pub emoji: String,
}

impl Team {
    pub fn new(
        slot: TeamSlot,
        role_id: Id<RoleMarker>,
        name: impl Into<String>,
        emoji: impl Into<String>,
    ) -> Self {
        Self {
            slot,
            role_id,
            name: name.into(),
            emoji: emoji.into(),
        }
    }

    /// Value accepted by the `nom` command option ("Papillons" -> "papillons")
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// The two configured teams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamPair {
    a: Team,
    b: Team,
}

impl TeamPair {
    pub fn new(a: Team, b: Team) -> Self {
        debug_assert_eq!(a.slot, TeamSlot::A);
        debug_assert_eq!(b.slot, TeamSlot::B);
        Self { a, b }
    }

    pub fn get(&self, slot: TeamSlot) -> &Team {
        match slot {
            TeamSlot::A => &self.a,
            TeamSlot::B => &self.b,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Team> {
        [&self.a, &self.b].into_iter()
    }

    /// Resolve a command option value to a team, case-insensitively
    pub fn by_key(&self, key: &str) -> Option<&Team> {
        let key = key.trim().to_lowercase();
        self.iter().find(|team| team.key() == key)
    }

    /// Which team a role belongs to, if any
    pub fn slot_of_role(&self, role_id: Id<RoleMarker>) -> Option<TeamSlot> {
        self.iter()
            .find(|team| team.role_id == role_id)
            .map(|team| team.slot)
    }
}

/// A non-bot guild member as seen by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub id: Id<UserMarker>,
    pub display_name: String,
}

impl MemberRef {
    pub fn new(id: Id<UserMarker>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}
