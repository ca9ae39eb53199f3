//! Team service
//!
//! Applies the balancing policy through the membership gateway. Counts are
//! re-read before every single assignment, including inside assign-all, so a
//! batch converges to balance instead of being planned against a snapshot.
//! Concurrent operations may race on those counts; the occasional
//! off-by-one that results is accepted rather than serialized away.

use crate::balancer::{choose_team, RandomSource};
use crate::error::BotError;
use crate::gateway::MembershipGateway;
use crate::metrics;
use crate::report::{render_welcome, BatchSummary, TeamStats};
use crate::team::{MemberRef, TeamPair, TeamSlot};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates assignment, reporting and reset for the two teams
#[derive(Clone)]
pub struct TeamService {
    gateway: Arc<dyn MembershipGateway>,
    teams: TeamPair,
    rng: Arc<dyn RandomSource>,
    notify: bool,
}

impl TeamService {
    pub fn new(
        gateway: Arc<dyn MembershipGateway>,
        teams: TeamPair,
        rng: Arc<dyn RandomSource>,
        notify: bool,
    ) -> Self {
        Self {
            gateway,
            teams,
            rng,
            notify,
        }
    }

    pub fn teams(&self) -> &TeamPair {
        &self.teams
    }

    /// Fail with `TeamNotFound` unless both team roles exist
    pub async fn verify_teams(&self) -> Result<(), BotError> {
        for team in self.teams.iter() {
            if !self.gateway.team_exists(team).await? {
                return Err(BotError::TeamNotFound {
                    team: team.name.clone(),
                    role_id: team.role_id.get(),
                });
            }
        }
        Ok(())
    }

    /// Live counts of both teams
    pub async fn stats(&self) -> Result<TeamStats, BotError> {
        self.verify_teams().await?;
        self.read_counts().await
    }

    /// Both counts from a single gateway read
    async fn read_counts(&self) -> Result<TeamStats, BotError> {
        let (count_a, count_b) = self.gateway.team_counts(&self.teams).await?;
        Ok(TeamStats::new(count_a, count_b))
    }

    /// Read fresh counts, pick a team and tag the member with it.
    ///
    /// The welcome message is best effort: a failed delivery is logged and
    /// the assignment still counts as done.
    pub async fn assign_member(&self, member: &MemberRef) -> Result<TeamSlot, BotError> {
        let counts = self.read_counts().await?;
        let slot = choose_team(counts.count_a, counts.count_b, self.rng.as_ref());
        let team = self.teams.get(slot);

        self.gateway.assign_team(member.id, team).await?;
        metrics::record_assignment(slot);

        info!(
            user_id = %member.id,
            member = %member.display_name,
            team = %team.name,
            count_a = counts.count_a,
            count_b = counts.count_b,
            "Member assigned"
        );

        if self.notify {
            if let Err(e) = self.gateway.notify_member(member.id, &render_welcome(team)).await {
                metrics::record_notification_failure();
                warn!(user_id = %member.id, error = %e, "Could not deliver team notification");
            }
        }

        Ok(slot)
    }

    /// Handle a member joining the guild. Bots are left alone.
    pub async fn handle_member_join(
        &self,
        member: &MemberRef,
        bot: bool,
    ) -> Result<Option<TeamSlot>, BotError> {
        if bot {
            debug!(user_id = %member.id, "Ignoring bot join");
            return Ok(None);
        }
        self.verify_teams().await?;
        self.assign_member(member).await.map(Some)
    }

    /// Assign every unassigned member, one at a time.
    ///
    /// Stops at the first failure without undoing earlier assignments;
    /// running it again only touches members that are still unassigned.
    pub async fn assign_all(&self) -> Result<BatchSummary, BotError> {
        self.verify_teams().await?;

        let unassigned = self.gateway.list_unassigned_members(&self.teams).await?;
        let mut summary = BatchSummary::default();
        if unassigned.is_empty() {
            info!("No unassigned members");
            summary.totals = self.read_counts().await?;
            return Ok(summary);
        }

        info!(members = unassigned.len(), "Assigning unassigned members");
        for member in &unassigned {
            let slot = self.assign_member(member).await?;
            summary.record(slot);
        }

        summary.totals = self.read_counts().await?;
        info!(
            assigned = summary.assigned(),
            total_a = summary.totals.count_a,
            total_b = summary.totals.count_b,
            "Bulk assignment complete"
        );
        Ok(summary)
    }

    /// Members of one team, bots excluded, in the gateway's order
    pub async fn roster(&self, slot: TeamSlot) -> Result<Vec<MemberRef>, BotError> {
        let team = self.teams.get(slot);
        if !self.gateway.team_exists(team).await? {
            return Err(BotError::TeamNotFound {
                team: team.name.clone(),
                role_id: team.role_id.get(),
            });
        }
        self.gateway.list_members(team).await
    }

    /// Strip both team roles from everyone holding either one.
    ///
    /// Returns how many members were reset. Idempotent: nobody left to reset
    /// means zero and no writes.
    pub async fn reset_all(&self) -> Result<usize, BotError> {
        self.verify_teams().await?;

        let mut seen = HashSet::new();
        let mut assigned = Vec::new();
        for team in self.teams.iter() {
            for member in self.gateway.list_members(team).await? {
                if seen.insert(member.id) {
                    assigned.push(member);
                }
            }
        }

        for member in &assigned {
            for team in self.teams.iter() {
                self.gateway.remove_team(member.id, team).await?;
            }
            debug!(user_id = %member.id, "Team roles removed");
        }

        metrics::record_reset(assigned.len());
        info!(members = assigned.len(), "Team roles reset");
        Ok(assigned.len())
    }
}
