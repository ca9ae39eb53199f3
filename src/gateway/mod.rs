//! Group membership gateway
//!
//! The guild is the system of record for team membership. The core only
//! talks to it through [`MembershipGateway`], so counts are always read
//! live and tests can swap in [`InMemoryGateway`].

mod discord;
mod memory;

pub use discord::{display_name, DiscordGateway};
pub use memory::InMemoryGateway;

use crate::error::BotError;
use crate::team::{MemberRef, Team, TeamPair};
use async_trait::async_trait;
use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;

/// Capabilities the team service needs from the hosting platform
///
/// Every method is an await point; unrelated operations may interleave
/// between calls.
#[async_trait]
pub trait MembershipGateway: Send + Sync {
    /// Whether the team's role exists in the guild
    async fn team_exists(&self, team: &Team) -> Result<bool, BotError>;

    /// Number of non-bot members holding the team's role
    async fn member_count(&self, team: &Team) -> Result<u64, BotError>;

    /// Non-bot member counts of both teams, read together from one snapshot
    async fn team_counts(&self, teams: &TeamPair) -> Result<(u64, u64), BotError>;

    /// Tag a member with the team's role
    async fn assign_team(&self, member: Id<UserMarker>, team: &Team) -> Result<(), BotError>;

    /// Remove the team's role from a member; a no-op if the role is not held
    async fn remove_team(&self, member: Id<UserMarker>, team: &Team) -> Result<(), BotError>;

    /// Non-bot members holding the team's role, in the gateway's native order
    async fn list_members(&self, team: &Team) -> Result<Vec<MemberRef>, BotError>;

    /// Non-bot members holding neither team's role, in the gateway's native order
    async fn list_unassigned_members(&self, teams: &TeamPair) -> Result<Vec<MemberRef>, BotError>;

    /// Send a direct message to a member
    ///
    /// Best effort: callers log failures and carry on.
    async fn notify_member(&self, member: Id<UserMarker>, message: &str) -> Result<(), BotError>;
}
