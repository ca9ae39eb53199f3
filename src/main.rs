//! teamsplit - Discord team balancing bot using Twilight
//!
//! - Assigns joining members to the smaller of two teams
//! - Answers the assignroles / equipe / stats / resetroles commands
//! - Exposes health/ready endpoints and Prometheus metrics

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use teamsplit::balancer::ThreadRandom;
use teamsplit::config::BotConfig;
use teamsplit::gateway::DiscordGateway;
use teamsplit::health::{self, AppState};
use teamsplit::metrics::BotMetrics;
use teamsplit::service::TeamService;
use teamsplit::shard::{BotContext, EventTasks, ShardRunner, ShardState};
use teamsplit::team::TeamSlot;
use twilight_http::Client;

// Events are handled one at a time between await points
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load configuration first to get log level
    let bot_config = BotConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("teamsplit={}", bot_config.log_level).parse()?)
                .add_directive("twilight_gateway=info".parse()?)
                .add_directive("twilight_http=warn".parse()?),
        )
        .json()
        .init();

    let team_a = bot_config.teams.get(TeamSlot::A);
    let team_b = bot_config.teams.get(TeamSlot::B);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        guild_id = %bot_config.guild_id,
        team_a = %team_a.name,
        role_a = %team_a.role_id,
        team_b = %team_b.name,
        role_b = %team_b.role_id,
        notify_members = bot_config.notify_members,
        "Starting teamsplit"
    );

    let metrics = BotMetrics::install()?;
    info!("Prometheus metrics initialized");

    let http = Arc::new(Client::new(bot_config.discord_token.clone()));
    let gateway = DiscordGateway::new(Arc::clone(&http), bot_config.guild_id);

    let service = TeamService::new(
        Arc::new(gateway),
        bot_config.teams.clone(),
        Arc::new(ThreadRandom),
        bot_config.notify_members,
    );

    // A missing role is reported per operation, not fatal at startup
    if let Err(e) = service.verify_teams().await {
        error!(error = %e, "Team roles could not be verified");
    }

    let shard_state = ShardState::new();
    let context = Arc::new(BotContext {
        http,
        service,
        guild_id: bot_config.guild_id,
        state: shard_state.clone(),
        tasks: EventTasks::new(),
    });

    let intents = BotConfig::intents();
    info!(?intents, "Using Discord intents");
    let runner = ShardRunner::new(bot_config.discord_token.clone(), intents, Arc::clone(&context));

    let app_state = AppState {
        shard_state,
        metrics,
    };
    let health_router = health::router(app_state);
    let addr: SocketAddr = ([0, 0, 0, 0], bot_config.http_port).into();

    info!(port = bot_config.http_port, "Starting HTTP server");

    let http_server = axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        health_router,
    );

    tokio::select! {
        result = runner.run() => {
            if let Err(e) = result {
                error!(error = %e, "Shard error");
            }
        }
        result = http_server => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // No new events are taken past this point; running batches finish and reply
    context.tasks.drain().await;

    info!("teamsplit shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
