//! In-process gateway
//!
//! Holds a fake guild in concurrent maps. Members are listed in join order.
//! Failure injection hooks let tests exercise the error taxonomy.

use crate::error::BotError;
use crate::gateway::MembershipGateway;
use crate::team::{MemberRef, Team, TeamPair, TeamSlot};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use twilight_model::id::marker::{RoleMarker, UserMarker};
use twilight_model::id::Id;

#[derive(Debug, Clone)]
struct MemberRecord {
    joined: u64,
    display_name: String,
    bot: bool,
    roles: HashSet<Id<RoleMarker>>,
}

/// Gateway backed by in-memory state
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    roles: DashSet<Id<RoleMarker>>,
    members: DashMap<Id<UserMarker>, MemberRecord>,
    next_join: AtomicU64,
    calls: AtomicU64,
    count_reads: AtomicU64,
    inbox: DashMap<Id<UserMarker>, Vec<String>>,
    dm_closed: DashSet<Id<UserMarker>>,
    assign_broken: DashSet<Id<UserMarker>>,
}

impl InMemoryGateway {
    /// A guild containing the given team roles and no members
    pub fn with_roles(roles: impl IntoIterator<Item = Id<RoleMarker>>) -> Self {
        let gateway = Self::default();
        for role in roles {
            gateway.roles.insert(role);
        }
        gateway
    }

    /// Add a human member; later joins list after earlier ones
    pub fn add_member(&self, id: Id<UserMarker>, display_name: &str) {
        self.insert(id, display_name, false);
    }

    /// Add an automated account
    pub fn add_bot(&self, id: Id<UserMarker>, display_name: &str) {
        self.insert(id, display_name, true);
    }

    fn insert(&self, id: Id<UserMarker>, display_name: &str, bot: bool) {
        let joined = self.next_join.fetch_add(1, Ordering::Relaxed);
        self.members.insert(
            id,
            MemberRecord {
                joined,
                display_name: display_name.to_string(),
                bot,
                roles: HashSet::new(),
            },
        );
    }

    /// Grant a role directly, bypassing the call counter
    pub fn grant_role(&self, id: Id<UserMarker>, role: Id<RoleMarker>) {
        if let Some(mut member) = self.members.get_mut(&id) {
            member.roles.insert(role);
        }
    }

    /// Delete a role from the guild
    pub fn delete_role(&self, role: Id<RoleMarker>) {
        self.roles.remove(&role);
        for mut member in self.members.iter_mut() {
            member.roles.remove(&role);
        }
    }

    /// Make direct messages to this member fail
    pub fn close_dms(&self, id: Id<UserMarker>) {
        self.dm_closed.insert(id);
    }

    /// Make role assignment for this member fail
    pub fn break_assignment(&self, id: Id<UserMarker>) {
        self.assign_broken.insert(id);
    }

    /// Undo [`break_assignment`](Self::break_assignment)
    pub fn repair_assignment(&self, id: Id<UserMarker>) {
        self.assign_broken.remove(&id);
    }

    /// Roles currently held by a member
    pub fn roles_of(&self, id: Id<UserMarker>) -> Vec<Id<RoleMarker>> {
        self.members
            .get(&id)
            .map(|m| m.roles.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Direct messages delivered to a member
    pub fn messages_for(&self, id: Id<UserMarker>) -> Vec<String> {
        self.inbox.get(&id).map(|m| m.value().clone()).unwrap_or_default()
    }

    /// Number of capability calls served so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Number of times team counts were read, single or paired
    pub fn count_reads(&self) -> u64 {
        self.count_reads.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn humans_where(&self, keep: impl Fn(&MemberRecord) -> bool) -> Vec<MemberRef> {
        let mut found: Vec<(u64, MemberRef)> = self
            .members
            .iter()
            .filter(|entry| !entry.bot && keep(entry.value()))
            .map(|entry| {
                (
                    entry.joined,
                    MemberRef::new(*entry.key(), entry.display_name.clone()),
                )
            })
            .collect();
        found.sort_by_key(|(joined, _)| *joined);
        found.into_iter().map(|(_, member)| member).collect()
    }

    fn require_role(&self, team: &Team) -> Result<(), BotError> {
        if self.roles.contains(&team.role_id) {
            Ok(())
        } else {
            Err(BotError::TeamNotFound {
                team: team.name.clone(),
                role_id: team.role_id.get(),
            })
        }
    }
}

#[async_trait]
impl MembershipGateway for InMemoryGateway {
    async fn team_exists(&self, team: &Team) -> Result<bool, BotError> {
        self.touch();
        Ok(self.roles.contains(&team.role_id))
    }

    async fn member_count(&self, team: &Team) -> Result<u64, BotError> {
        self.touch();
        self.count_reads.fetch_add(1, Ordering::Relaxed);
        let count = self
            .members
            .iter()
            .filter(|m| !m.bot && m.roles.contains(&team.role_id))
            .count();
        Ok(count as u64)
    }

    async fn team_counts(&self, teams: &TeamPair) -> Result<(u64, u64), BotError> {
        self.touch();
        self.count_reads.fetch_add(1, Ordering::Relaxed);
        let holding = |team: &Team| {
            self.members
                .iter()
                .filter(|m| !m.bot && m.roles.contains(&team.role_id))
                .count() as u64
        };
        Ok((holding(teams.get(TeamSlot::A)), holding(teams.get(TeamSlot::B))))
    }

    async fn assign_team(&self, member: Id<UserMarker>, team: &Team) -> Result<(), BotError> {
        self.touch();
        self.require_role(team)?;
        if self.assign_broken.contains(&member) {
            return Err(BotError::http(
                "add_guild_member_role",
                std::io::Error::other("injected assignment failure"),
            ));
        }
        let mut record = self
            .members
            .get_mut(&member)
            .ok_or(BotError::MemberNotFound { user_id: member.get() })?;
        record.roles.insert(team.role_id);
        Ok(())
    }

    async fn remove_team(&self, member: Id<UserMarker>, team: &Team) -> Result<(), BotError> {
        self.touch();
        self.require_role(team)?;
        let mut record = self
            .members
            .get_mut(&member)
            .ok_or(BotError::MemberNotFound { user_id: member.get() })?;
        record.roles.remove(&team.role_id);
        Ok(())
    }

    async fn list_members(&self, team: &Team) -> Result<Vec<MemberRef>, BotError> {
        self.touch();
        Ok(self.humans_where(|m| m.roles.contains(&team.role_id)))
    }

    async fn list_unassigned_members(&self, teams: &TeamPair) -> Result<Vec<MemberRef>, BotError> {
        self.touch();
        Ok(self.humans_where(|m| teams.iter().all(|team| !m.roles.contains(&team.role_id))))
    }

    async fn notify_member(&self, member: Id<UserMarker>, message: &str) -> Result<(), BotError> {
        self.touch();
        if self.dm_closed.contains(&member) {
            return Err(BotError::http(
                "create_private_channel",
                std::io::Error::other("cannot send messages to this user"),
            ));
        }
        self.inbox.entry(member).or_default().push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team_a() -> Team {
        Team::new(TeamSlot::A, Id::new(10), "Papillons", "🦋")
    }

    #[test]
    fn bots_are_never_counted_or_listed() {
        let gateway = InMemoryGateway::with_roles([Id::new(10)]);
        gateway.add_member(Id::new(1), "alice");
        gateway.add_bot(Id::new(2), "robot");
        gateway.grant_role(Id::new(1), Id::new(10));
        gateway.grant_role(Id::new(2), Id::new(10));

        let team = team_a();
        let count = tokio_test::block_on(gateway.member_count(&team)).unwrap();
        let listed = tokio_test::block_on(gateway.list_members(&team)).unwrap();

        assert_eq!(count, 1);
        assert_eq!(listed, vec![MemberRef::new(Id::new(1), "alice")]);
    }

    #[test]
    fn paired_counts_match_single_counts() {
        let gateway = InMemoryGateway::with_roles([Id::new(10), Id::new(20)]);
        let teams = TeamPair::new(team_a(), Team::new(TeamSlot::B, Id::new(20), "Dragons", "🐉"));
        for (id, role) in [(1, 10), (2, 10), (3, 20)] {
            gateway.add_member(Id::new(id), "member");
            gateway.grant_role(Id::new(id), Id::new(role));
        }
        gateway.add_bot(Id::new(4), "robot");
        gateway.grant_role(Id::new(4), Id::new(20));

        let counts = tokio_test::block_on(gateway.team_counts(&teams)).unwrap();
        assert_eq!(counts, (2, 1));
        assert_eq!(gateway.count_reads(), 1);
    }

    #[test]
    fn listing_follows_join_order() {
        let gateway = InMemoryGateway::with_roles([Id::new(10)]);
        for (id, name) in [(30, "carol"), (10, "alice"), (20, "bob")] {
            gateway.add_member(Id::new(id), name);
            gateway.grant_role(Id::new(id), Id::new(10));
        }

        let names: Vec<_> = tokio_test::block_on(gateway.list_members(&team_a()))
            .unwrap()
            .into_iter()
            .map(|m| m.display_name)
            .collect();
        assert_eq!(names, ["carol", "alice", "bob"]);
    }

    #[test]
    fn removing_an_absent_role_is_a_no_op() {
        let gateway = InMemoryGateway::with_roles([Id::new(10)]);
        gateway.add_member(Id::new(1), "alice");

        tokio_test::assert_ok!(tokio_test::block_on(gateway.remove_team(Id::new(1), &team_a())));
        assert!(gateway.roles_of(Id::new(1)).is_empty());
    }

    #[test]
    fn assignment_to_missing_role_fails() {
        let gateway = InMemoryGateway::with_roles([]);
        gateway.add_member(Id::new(1), "alice");

        let err = tokio_test::block_on(gateway.assign_team(Id::new(1), &team_a())).unwrap_err();
        assert!(matches!(err, BotError::TeamNotFound { role_id: 10, .. }));
    }

    #[test]
    fn closed_dms_fail_delivery() {
        let gateway = InMemoryGateway::with_roles([]);
        gateway.add_member(Id::new(1), "alice");
        gateway.close_dms(Id::new(1));

        assert!(tokio_test::block_on(gateway.notify_member(Id::new(1), "hi")).is_err());
        assert!(gateway.messages_for(Id::new(1)).is_empty());
    }
}
