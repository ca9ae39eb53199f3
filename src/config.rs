//! Bot configuration module
//!
//! Loads settings from the process environment (and a `.env` file when
//! present) through the `config` crate.

use crate::error::BotError;
use crate::team::{Team, TeamPair, TeamSlot};
use serde::Deserialize;
use twilight_gateway::Intents;
use twilight_model::id::marker::{GuildMarker, RoleMarker};
use twilight_model::id::Id;

/// Bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Discord bot token
    pub discord_token: String,

    /// Guild whose members are balanced
    pub guild_id: Id<GuildMarker>,

    /// The two teams, with their roles
    pub teams: TeamPair,

    /// Send a direct message to members after assignment
    pub notify_members: bool,

    /// Health/metrics HTTP port
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Environment as deserialized; keys are the lowercased variable names
#[derive(Debug, Deserialize)]
struct RawConfig {
    discord_token: Option<String>,
    token: Option<String>,
    guild_id: Option<u64>,
    role_1_id: Option<u64>,
    role_2_id: Option<u64>,
    team_1_name: String,
    team_1_emoji: String,
    team_2_name: String,
    team_2_emoji: String,
    notify_members: bool,
    http_port: u16,
    log_level: String,
}

impl BotConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BotError> {
        dotenvy::dotenv().ok();

        let source = Self::defaults()?
            .add_source(config::Environment::default())
            .build()
            .map_err(|e| BotError::Config(e.to_string()))?;

        Self::from_source(source)
    }

    /// Builder pre-filled with every optional setting
    pub fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, BotError> {
        config::Config::builder()
            .set_default("team_1_name", "Papillons")
            .and_then(|b| b.set_default("team_1_emoji", "🦋"))
            .and_then(|b| b.set_default("team_2_name", "Dragons"))
            .and_then(|b| b.set_default("team_2_emoji", "🐉"))
            .and_then(|b| b.set_default("notify_members", true))
            .and_then(|b| b.set_default("http_port", 9090_i64))
            .and_then(|b| b.set_default("log_level", "info"))
            .map_err(|e| BotError::Config(e.to_string()))
    }

    /// Validate an already-built configuration source
    pub fn from_source(source: config::Config) -> Result<Self, BotError> {
        let raw: RawConfig = source
            .try_deserialize()
            .map_err(|e| BotError::Config(e.to_string()))?;

        let discord_token = raw
            .discord_token
            .or(raw.token)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| BotError::Config("DISCORD_TOKEN or TOKEN must be set".to_string()))?;

        let guild_id = required_id("GUILD_ID", raw.guild_id)?;
        let role_1: Id<RoleMarker> = required_id("ROLE_1_ID", raw.role_1_id)?;
        let role_2: Id<RoleMarker> = required_id("ROLE_2_ID", raw.role_2_id)?;

        if role_1 == role_2 {
            return Err(BotError::Config(
                "ROLE_1_ID and ROLE_2_ID must be different roles".to_string(),
            ));
        }
        if raw.team_1_name.trim().to_lowercase() == raw.team_2_name.trim().to_lowercase() {
            return Err(BotError::Config(
                "TEAM_1_NAME and TEAM_2_NAME must differ".to_string(),
            ));
        }

        let teams = TeamPair::new(
            Team::new(TeamSlot::A, role_1, raw.team_1_name.trim(), raw.team_1_emoji),
            Team::new(TeamSlot::B, role_2, raw.team_2_name.trim(), raw.team_2_emoji),
        );

        Ok(Self {
            discord_token,
            guild_id,
            teams,
            notify_members: raw.notify_members,
            http_port: raw.http_port,
            log_level: raw.log_level,
        })
    }

    /// Get configured Discord intents
    ///
    /// - GUILDS: guild lifecycle and interactions
    /// - GUILD_MEMBERS: member join events (privileged)
    pub fn intents() -> Intents {
        Intents::GUILDS | Intents::GUILD_MEMBERS
    }
}

fn required_id<T>(name: &str, value: Option<u64>) -> Result<Id<T>, BotError> {
    let value = value.ok_or_else(|| BotError::Config(format!("{name} must be set")))?;
    Id::new_checked(value)
        .ok_or_else(|| BotError::Config(format!("{name} must be a non-zero snowflake")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(overrides: &[(&str, &str)]) -> config::Config {
        let mut builder = BotConfig::defaults().unwrap();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("discord_token", "secret"),
        ("guild_id", "1000"),
        ("role_1_id", "11"),
        ("role_2_id", "22"),
    ];

    #[test]
    fn test_intents_are_minimal() {
        let intents = BotConfig::intents();

        assert!(intents.contains(Intents::GUILDS));
        assert!(intents.contains(Intents::GUILD_MEMBERS));
        assert!(!intents.contains(Intents::MESSAGE_CONTENT));
    }

    #[test]
    fn test_default_values() {
        let config = BotConfig::from_source(source(REQUIRED)).unwrap();

        assert_eq!(config.discord_token, "secret");
        assert_eq!(config.guild_id.get(), 1000);
        assert_eq!(config.teams.get(TeamSlot::A).role_id.get(), 11);
        assert_eq!(config.teams.get(TeamSlot::A).name, "Papillons");
        assert_eq!(config.teams.get(TeamSlot::B).emoji, "🐉");
        assert!(config.notify_members);
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_token_alias() {
        let overrides = [
            ("token", "legacy"),
            ("guild_id", "1"),
            ("role_1_id", "2"),
            ("role_2_id", "3"),
        ];
        let config = BotConfig::from_source(source(&overrides)).unwrap();
        assert_eq!(config.discord_token, "legacy");
    }

    #[test]
    fn test_overrides_apply() {
        let mut overrides = REQUIRED.to_vec();
        overrides.extend([
            ("team_1_name", "Loups"),
            ("notify_members", "false"),
            ("http_port", "8081"),
        ]);
        let config = BotConfig::from_source(source(&overrides)).unwrap();

        assert_eq!(config.teams.get(TeamSlot::A).key(), "loups");
        assert!(!config.notify_members);
        assert_eq!(config.http_port, 8081);
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let err = BotConfig::from_source(source(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }

    #[test]
    fn test_zero_and_missing_ids_are_rejected() {
        let mut overrides = REQUIRED.to_vec();
        overrides[1] = ("guild_id", "0");
        let err = BotConfig::from_source(source(&overrides)).unwrap_err();
        assert!(err.to_string().contains("GUILD_ID"));

        let err = BotConfig::from_source(source(&REQUIRED[..3])).unwrap_err();
        assert!(err.to_string().contains("ROLE_2_ID"));
    }

    #[test]
    fn test_identical_roles_are_rejected() {
        let mut overrides = REQUIRED.to_vec();
        overrides[3] = ("role_2_id", "11");
        let err = BotConfig::from_source(source(&overrides)).unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
    }
}
