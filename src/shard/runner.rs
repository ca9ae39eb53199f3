//! Shard event loop
//!
//! Receives gateway events and hands member joins and slash commands to the
//! team service. Each handled event runs in its own tracked task, so
//! independent triggers interleave at every gateway await point and shutdown
//! can wait for them.

use crate::error::BotError;
use crate::gateway::display_name;
use crate::interaction;
use crate::metrics;
use crate::service::TeamService;
use crate::shard::state::{ShardHealth, ShardState};
use crate::shard::tasks::EventTasks;
use crate::team::MemberRef;

use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use twilight_gateway::{Config, EventTypeFlags, Intents, Shard, StreamExt as _};
use twilight_http::Client;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::gateway::{event::Event, ShardId};
use twilight_model::id::marker::GuildMarker;
use twilight_model::id::Id;
use uuid::Uuid;

/// Consecutive receive errors after which the shard is declared dead
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Everything an event handler needs
pub struct BotContext {
    pub http: Arc<Client>,
    pub service: TeamService,
    pub guild_id: Id<GuildMarker>,
    pub state: ShardState,
    /// Handlers still running; drained on shutdown
    pub tasks: EventTasks,
}

/// Owns the shard and drives its event loop
pub struct ShardRunner {
    shard: Shard,
    context: Arc<BotContext>,
}

impl ShardRunner {
    pub fn new(token: String, intents: Intents, context: Arc<BotContext>) -> Self {
        let shard = Shard::with_config(ShardId::ONE, Config::new(token, intents));
        Self { shard, context }
    }

    /// Run until the event stream ends or the shard dies
    pub async fn run(self) -> Result<(), BotError> {
        run_shard(self.shard, self.context).await
    }
}

async fn run_shard(mut shard: Shard, context: Arc<BotContext>) -> Result<(), BotError> {
    let state = context.state.clone();
    state.set_health(ShardHealth::Connecting);
    metrics::set_shard_ready(false);
    info!(guild_id = %context.guild_id, "Shard starting");

    let mut consecutive_errors: u32 = 0;

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => {
                consecutive_errors = 0;
                event
            }
            Err(source) => {
                consecutive_errors += 1;
                warn!(error = %source, consecutive = consecutive_errors, "Error receiving event");

                if matches!(source.kind(), twilight_gateway::error::ReceiveMessageErrorType::Reconnect) {
                    let err = BotError::ShardReconnectFailed(Box::new(source));
                    metrics::record_error(&err);
                    state.set_health(ShardHealth::Dead);
                    metrics::set_shard_ready(false);
                    error!("Fatal gateway error (reconnect failed)");
                    return Err(err);
                }

                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    let err = BotError::ShardCircuitBroken {
                        count: consecutive_errors,
                        max: MAX_CONSECUTIVE_ERRORS,
                    };
                    metrics::record_error(&err);
                    state.set_health(ShardHealth::Dead);
                    metrics::set_shard_ready(false);
                    error!(consecutive = consecutive_errors, "Shard dead: consecutive error threshold exceeded");
                    return Err(err);
                }

                state.set_health(ShardHealth::Disconnected);
                metrics::set_shard_ready(false);
                continue;
            }
        };

        state.record_event();
        metrics::record_event(&event);

        match event {
            Event::Ready(ready) => {
                state.set_health(ShardHealth::Ready);
                state.set_guilds(ready.guilds.len() as u64);
                metrics::set_shard_ready(true);
                info!(guilds = ready.guilds.len(), session_id = %ready.session_id, "Shard ready");
            }
            Event::Resumed => {
                state.set_health(ShardHealth::Ready);
                metrics::set_shard_ready(true);
                info!("Shard resumed");
            }
            Event::GatewayHeartbeatAck => {
                state.record_heartbeat();
            }
            other => match route(other, context.guild_id) {
                Some(Routed::MemberJoin { member, bot }) => {
                    state.record_member_join();
                    let handler = Arc::clone(&context);
                    let span = info_span!("member_join", operation_id = %Uuid::new_v4(), user_id = %member.id);

                    context.tasks.spawn(
                        async move {
                            if let Err(e) = handler.service.handle_member_join(&member, bot).await {
                                metrics::record_error(&e);
                                error!(error = %e, "Could not assign joining member");
                            }
                        }
                        .instrument(span),
                    );
                }
                Some(Routed::Command(interaction)) => {
                    state.record_command();
                    let handler = Arc::clone(&context);
                    let span = info_span!("interaction", operation_id = %Uuid::new_v4(), interaction_id = %interaction.id);

                    context.tasks.spawn(
                        async move {
                            if let Err(e) = interaction::respond(&handler.http, &interaction, &handler.service).await {
                                metrics::record_error(&e);
                                error!(error = %e, "Could not answer interaction");
                            }
                        }
                        .instrument(span),
                    );
                }
                None => {}
            },
        }
    }

    info!("Shard event stream ended");
    Ok(())
}

/// Work a guild event hands to the team service
#[derive(Debug)]
enum Routed {
    MemberJoin { member: MemberRef, bot: bool },
    Command(Box<InteractionCreate>),
}

/// Keep only member joins and interactions from the configured guild
fn route(event: Event, guild_id: Id<GuildMarker>) -> Option<Routed> {
    match event {
        Event::MemberAdd(added) if added.guild_id == guild_id => Some(Routed::MemberJoin {
            member: MemberRef::new(added.user.id, display_name(&added)),
            bot: added.user.bot,
        }),
        Event::MemberAdd(added) => {
            debug!(guild_id = %added.guild_id, "Ignoring member join in another guild");
            None
        }
        Event::InteractionCreate(interaction) if interaction.guild_id == Some(guild_id) => {
            Some(Routed::Command(interaction))
        }
        Event::InteractionCreate(interaction) => {
            debug!(interaction_id = %interaction.id, "Ignoring interaction outside the configured guild");
            None
        }
        _ => None,
    }
}
