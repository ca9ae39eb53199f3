//! Discord-backed gateway
//!
//! Reads membership through the paginated guild member list and writes role
//! changes and direct messages through the REST API. Nothing is cached:
//! every count walks the member list again, once for both teams.

use crate::error::BotError;
use crate::gateway::MembershipGateway;
use crate::team::{MemberRef, Team, TeamPair, TeamSlot};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use twilight_http::Client;
use twilight_model::guild::Member;
use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::id::Id;

/// Largest page the member list endpoint returns
const MEMBER_PAGE_SIZE: u16 = 1000;

/// Gateway talking to a single guild over the Discord HTTP API
#[derive(Debug, Clone)]
pub struct DiscordGateway {
    http: Arc<Client>,
    guild_id: Id<GuildMarker>,
}

impl DiscordGateway {
    pub fn new(http: Arc<Client>, guild_id: Id<GuildMarker>) -> Self {
        Self { http, guild_id }
    }

    /// Every non-bot member, ascending by user id
    async fn fetch_humans(&self) -> Result<Vec<Member>, BotError> {
        let mut humans = Vec::new();
        let mut after = None;

        loop {
            let mut request = self
                .http
                .guild_members(self.guild_id)
                .limit(MEMBER_PAGE_SIZE);
            if let Some(after) = after {
                request = request.after(after);
            }

            let page = request
                .await
                .map_err(|e| BotError::http("guild_members", e))?
                .models()
                .await
                .map_err(|e| BotError::http("guild_members", e))?;

            let page_len = page.len();
            after = page.last().map(|member| member.user.id);
            humans.extend(page.into_iter().filter(|member| !member.user.bot));

            if page_len < usize::from(MEMBER_PAGE_SIZE) {
                break;
            }
        }

        debug!(guild_id = %self.guild_id, members = humans.len(), "Fetched guild members");
        Ok(humans)
    }
}

/// Nickname, then global name, then username
pub fn display_name(member: &Member) -> String {
    member
        .nick
        .clone()
        .or_else(|| member.user.global_name.clone())
        .unwrap_or_else(|| member.user.name.clone())
}

fn member_ref(member: &Member) -> MemberRef {
    MemberRef::new(member.user.id, display_name(member))
}

/// Members holding each team's role, from one page walk
fn count_by_team(humans: &[Member], teams: &TeamPair) -> (u64, u64) {
    humans
        .iter()
        .flat_map(|member| member.roles.iter().filter_map(|role| teams.slot_of_role(*role)))
        .fold((0, 0), |(a, b), slot| match slot {
            TeamSlot::A => (a + 1, b),
            TeamSlot::B => (a, b + 1),
        })
}

#[async_trait]
impl MembershipGateway for DiscordGateway {
    async fn team_exists(&self, team: &Team) -> Result<bool, BotError> {
        let roles = self
            .http
            .roles(self.guild_id)
            .await
            .map_err(|e| BotError::http("roles", e))?
            .models()
            .await
            .map_err(|e| BotError::http("roles", e))?;

        Ok(roles.iter().any(|role| role.id == team.role_id))
    }

    async fn member_count(&self, team: &Team) -> Result<u64, BotError> {
        let humans = self.fetch_humans().await?;
        let count = humans
            .iter()
            .filter(|member| member.roles.contains(&team.role_id))
            .count();
        Ok(count as u64)
    }

    async fn team_counts(&self, teams: &TeamPair) -> Result<(u64, u64), BotError> {
        let humans = self.fetch_humans().await?;
        Ok(count_by_team(&humans, teams))
    }

    async fn assign_team(&self, member: Id<UserMarker>, team: &Team) -> Result<(), BotError> {
        self.http
            .add_guild_member_role(self.guild_id, member, team.role_id)
            .await
            .map_err(|e| BotError::http("add_guild_member_role", e))?;
        Ok(())
    }

    async fn remove_team(&self, member: Id<UserMarker>, team: &Team) -> Result<(), BotError> {
        // Discord answers 204 whether or not the member held the role
        self.http
            .remove_guild_member_role(self.guild_id, member, team.role_id)
            .await
            .map_err(|e| BotError::http("remove_guild_member_role", e))?;
        Ok(())
    }

    async fn list_members(&self, team: &Team) -> Result<Vec<MemberRef>, BotError> {
        let humans = self.fetch_humans().await?;
        Ok(humans
            .iter()
            .filter(|member| member.roles.contains(&team.role_id))
            .map(member_ref)
            .collect())
    }

    async fn list_unassigned_members(&self, teams: &TeamPair) -> Result<Vec<MemberRef>, BotError> {
        let humans = self.fetch_humans().await?;
        Ok(humans
            .iter()
            .filter(|member| member.roles.iter().all(|role| teams.slot_of_role(*role).is_none()))
            .map(member_ref)
            .collect())
    }

    async fn notify_member(&self, member: Id<UserMarker>, message: &str) -> Result<(), BotError> {
        let channel = self
            .http
            .create_private_channel(member)
            .await
            .map_err(|e| BotError::http("create_private_channel", e))?
            .model()
            .await
            .map_err(|e| BotError::http("create_private_channel", e))?;

        self.http
            .create_message(channel.id)
            .content(message)
            .await
            .map_err(|e| BotError::http("create_message", e))?;
        Ok(())
    }
}
