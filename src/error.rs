//! Domain error types for teamsplit
//!
//! main.rs is the ONLY module allowed to use anyhow::Result (process boundary).
//! All application code returns Result<T, BotError>.

use thiserror::Error;

/// Bot domain errors
///
/// Every variant carries structured context fields for diagnostics.
/// Handlers pattern-match on the variant to pick the user-visible reply
/// without parsing error message strings.
///
/// Example log output:
/// ```text
/// BotError::TeamNotFound { team: "Dragons", role_id: 42 }
/// → "team 'Dragons' has no role 42 in the guild"
/// ```
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration error (environment variable missing or invalid)
    #[error("configuration error: {0}")]
    Config(String),

    /// A configured team role does not exist in the guild
    #[error("team '{team}' has no role {role_id} in the guild")]
    TeamNotFound { team: String, role_id: u64 },

    /// Invoker lacks the permission a mutating command requires
    #[error("command '{command}' requires administrator permission")]
    Unauthorized { command: String },

    /// Command name not present in the dispatch table
    #[error("unknown command '{name}'")]
    UnknownCommand { name: String },

    /// Required command option was not supplied
    #[error("command '{command}' is missing option '{option}'")]
    MissingOption { command: String, option: String },

    /// Command option value could not be interpreted
    #[error("invalid value '{value}' for option '{option}'")]
    InvalidOption { option: String, value: String },

    /// Discord HTTP request failed
    #[error("discord request '{operation}' failed")]
    Http {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Member is not known to the gateway
    #[error("member {user_id} not found")]
    MemberNotFound { user_id: u64 },

    /// Shard exceeded consecutive error threshold (circuit breaker tripped)
    #[error("shard exceeded consecutive error threshold ({count}/{max})")]
    ShardCircuitBroken { count: u32, max: u32 },

    /// Shard reconnection failed (fatal — shard marked dead)
    #[error("shard reconnection failed")]
    ShardReconnectFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Prometheus recorder could not be installed
    #[error("metrics recorder installation failed: {0}")]
    MetricsInstall(String),
}

impl BotError {
    /// Wrap a Discord HTTP failure with the name of the request that failed.
    pub fn http(
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Http {
            operation,
            source: Box::new(source),
        }
    }

    /// Returns a static label string suitable for Prometheus metrics.
    ///
    /// Used as the `error_type` label on `teamsplit_errors_total`.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::TeamNotFound { .. } => "team_not_found",
            Self::Unauthorized { .. } => "unauthorized",
            Self::UnknownCommand { .. } => "unknown_command",
            Self::MissingOption { .. } => "missing_option",
            Self::InvalidOption { .. } => "invalid_option",
            Self::Http { .. } => "http",
            Self::MemberNotFound { .. } => "member_not_found",
            Self::ShardCircuitBroken { .. } => "circuit_broken",
            Self::ShardReconnectFailed(_) => "reconnect_failed",
            Self::MetricsInstall(_) => "metrics_install",
        }
    }

    /// Terse reply shown to the command invoker.
    ///
    /// Lookup, authorization and input errors get a specific message;
    /// everything else collapses to a generic failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::TeamNotFound { .. } => "❌ Rôles introuvables.".to_string(),
            Self::Unauthorized { .. } => "❌ Tu dois être administrateur.".to_string(),
            Self::UnknownCommand { name } => format!("❌ Commande inconnue : `{name}`."),
            Self::MissingOption { option, .. } => format!("❌ Option manquante : `{option}`."),
            Self::InvalidOption { value, .. } => format!("❌ Équipe inconnue : `{value}`."),
            _ => "❌ Une erreur est survenue.".to_string(),
        }
    }
}
