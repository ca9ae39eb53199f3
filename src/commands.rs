//! Slash command dispatch
//!
//! [`COMMANDS`] maps each command name to its kind and permission
//! requirement. An [`Invocation`] is resolved against that table, checked for
//! permission before any gateway I/O, parsed into a [`Command`] and run
//! against the [`TeamService`].

use crate::error::BotError;
use crate::metrics;
use crate::report;
use crate::service::TeamService;
use crate::team::{TeamPair, TeamSlot};
use tracing::{error, info, warn};

/// Option naming the team for `equipe`
pub const TEAM_OPTION: &str = "nom";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    AssignAll,
    ShowTeam,
    Stats,
    ResetAll,
}

/// One row of the dispatch table
#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub kind: CommandKind,
    pub admin_only: bool,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "assignroles",
        kind: CommandKind::AssignAll,
        admin_only: true,
    },
    CommandSpec {
        name: "equipe",
        kind: CommandKind::ShowTeam,
        admin_only: false,
    },
    CommandSpec {
        name: "stats",
        kind: CommandKind::Stats,
        admin_only: false,
    },
    CommandSpec {
        name: "resetroles",
        kind: CommandKind::ResetAll,
        admin_only: true,
    },
];

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// A command as received, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    /// String-valued options, by name
    pub options: Vec<(String, String)>,
    pub is_admin: bool,
}

impl Invocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((name.into(), value.into()));
        self
    }

    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    fn get_option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A validated command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AssignAll,
    ShowTeam(TeamSlot),
    Stats,
    ResetAll,
}

impl Command {
    /// Resolve and validate an invocation. Performs no I/O.
    pub fn parse(
        invocation: &Invocation,
        teams: &TeamPair,
    ) -> Result<(Self, &'static CommandSpec), BotError> {
        let spec = lookup(&invocation.name).ok_or_else(|| BotError::UnknownCommand {
            name: invocation.name.clone(),
        })?;

        if spec.admin_only && !invocation.is_admin {
            return Err(BotError::Unauthorized {
                command: spec.name.to_string(),
            });
        }

        let command = match spec.kind {
            CommandKind::AssignAll => Command::AssignAll,
            CommandKind::Stats => Command::Stats,
            CommandKind::ResetAll => Command::ResetAll,
            CommandKind::ShowTeam => {
                let value = invocation.get_option(TEAM_OPTION).ok_or_else(|| {
                    BotError::MissingOption {
                        command: spec.name.to_string(),
                        option: TEAM_OPTION.to_string(),
                    }
                })?;
                let team = teams.by_key(value).ok_or_else(|| BotError::InvalidOption {
                    option: TEAM_OPTION.to_string(),
                    value: value.to_string(),
                })?;
                Command::ShowTeam(team.slot)
            }
        };

        Ok((command, spec))
    }
}

/// What to send back to the invoker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// First entry edits the deferred response; the rest are follow-ups
    pub messages: Vec<String>,
    pub ephemeral: bool,
}

impl Reply {
    fn new(messages: Vec<String>, ephemeral: bool) -> Self {
        Self { messages, ephemeral }
    }

    fn single(message: String, ephemeral: bool) -> Self {
        Self::new(vec![message], ephemeral)
    }
}

/// Whether the reply to this invocation should be private.
///
/// Known before any work runs, so the response can be deferred with the
/// right visibility.
pub fn is_ephemeral(invocation: &Invocation) -> bool {
    lookup(&invocation.name).map_or(true, |spec| spec.admin_only)
}

/// Run an invocation to completion and build the reply.
///
/// Every failure ends here as a terse user message; nothing propagates.
pub async fn dispatch(service: &TeamService, invocation: &Invocation) -> Reply {
    match Command::parse(invocation, service.teams()) {
        Ok((command, spec)) => run(service, command, spec).await,
        Err(e) => reject(invocation, &e),
    }
}

/// Reply for an invocation that failed to parse or was not permitted
pub fn reject(invocation: &Invocation, error: &BotError) -> Reply {
    warn!(command = %invocation.name, error = %error, "Command rejected");
    metrics::record_error(error);
    Reply::single(error.user_message(), is_ephemeral(invocation))
}

/// Execute an already validated command
pub async fn run(service: &TeamService, command: Command, spec: &'static CommandSpec) -> Reply {
    let ephemeral = spec.admin_only;
    info!(command = spec.name, parsed = ?command, "Running command");

    match execute(service, command).await {
        Ok(messages) => {
            metrics::record_command(spec.name, "ok");
            Reply::new(messages, ephemeral)
        }
        Err(e) => {
            error!(command = spec.name, error = %e, "Command failed");
            metrics::record_command(spec.name, "error");
            metrics::record_error(&e);
            Reply::single(e.user_message(), ephemeral)
        }
    }
}

async fn execute(service: &TeamService, command: Command) -> Result<Vec<String>, BotError> {
    let teams = service.teams();
    match command {
        Command::AssignAll => {
            let summary = service.assign_all().await?;
            Ok(vec![report::render_batch(teams, &summary)])
        }
        Command::ShowTeam(slot) => {
            let members = service.roster(slot).await?;
            Ok(report::render_roster(teams.get(slot), &members))
        }
        Command::Stats => {
            let stats = service.stats().await?;
            Ok(vec![report::render_stats(teams, &stats)])
        }
        Command::ResetAll => {
            let reset = service.reset_all().await?;
            Ok(vec![report::render_reset(teams, reset)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;
    use twilight_model::id::Id;

    fn teams() -> TeamPair {
        TeamPair::new(
            Team::new(TeamSlot::A, Id::new(1), "Papillons", "🦋"),
            Team::new(TeamSlot::B, Id::new(2), "Dragons", "🐉"),
        )
    }

    #[test]
    fn table_names_are_unique() {
        let mut names: Vec<_> = COMMANDS.iter().map(|spec| spec.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), COMMANDS.len());
    }

    #[test]
    fn only_mutating_commands_require_admin() {
        for spec in COMMANDS {
            let mutating = matches!(spec.kind, CommandKind::AssignAll | CommandKind::ResetAll);
            assert_eq!(spec.admin_only, mutating, "{}", spec.name);
        }
    }

    #[test]
    fn parses_every_command() {
        let teams = teams();
        let cases = [
            (Invocation::new("assignroles").as_admin(), Command::AssignAll),
            (Invocation::new("stats"), Command::Stats),
            (Invocation::new("resetroles").as_admin(), Command::ResetAll),
            (
                Invocation::new("equipe").option("nom", "dragons"),
                Command::ShowTeam(TeamSlot::B),
            ),
            (
                Invocation::new("equipe").option("nom", "Papillons"),
                Command::ShowTeam(TeamSlot::A),
            ),
        ];
        for (invocation, expected) in cases {
            let (command, _) = Command::parse(&invocation, &teams).unwrap();
            assert_eq!(command, expected);
        }
    }

    #[test]
    fn non_admin_cannot_mutate() {
        let teams = teams();
        for name in ["assignroles", "resetroles"] {
            let err = Command::parse(&Invocation::new(name), &teams).unwrap_err();
            assert!(matches!(err, BotError::Unauthorized { .. }), "{name}: {err:?}");
        }
    }

    #[test]
    fn rejects_unknown_command_and_bad_options() {
        let teams = teams();

        let err = Command::parse(&Invocation::new("kick"), &teams).unwrap_err();
        assert!(matches!(err, BotError::UnknownCommand { .. }));

        let err = Command::parse(&Invocation::new("equipe"), &teams).unwrap_err();
        assert!(matches!(err, BotError::MissingOption { .. }));

        let err = Command::parse(&Invocation::new("equipe").option("nom", "licornes"), &teams)
            .unwrap_err();
        assert!(matches!(err, BotError::InvalidOption { .. }));
    }

    #[test]
    fn rejection_reply_is_private_for_admin_commands() {
        let invocation = Invocation::new("resetroles");
        let err = Command::parse(&invocation, &teams()).unwrap_err();

        let reply = reject(&invocation, &err);
        assert!(reply.ephemeral);
        assert_eq!(reply.messages.len(), 1);
        assert!(reply.messages[0].starts_with('❌'));
    }

    #[test]
    fn admin_commands_reply_privately() {
        assert!(is_ephemeral(&Invocation::new("assignroles")));
        assert!(is_ephemeral(&Invocation::new("resetroles")));
        assert!(!is_ephemeral(&Invocation::new("stats")));
        assert!(!is_ephemeral(&Invocation::new("equipe")));
        assert!(is_ephemeral(&Invocation::new("unknown")));
    }
}
