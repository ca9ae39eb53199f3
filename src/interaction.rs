//! Slash command interactions
//!
//! Converts a Twilight interaction into an [`Invocation`] and validates it.
//! A rejected invocation is answered in a single response. Otherwise the
//! response is deferred, the command runs, the deferred response is edited
//! with the first reply message and the rest go out as follow-ups.

use crate::commands::{reject, run, Command, Invocation};
use crate::error::BotError;
use crate::service::TeamService;
use tracing::debug;
use twilight_http::Client;
use twilight_model::application::interaction::application_command::{
    CommandData, CommandOptionValue,
};
use twilight_model::application::interaction::{Interaction, InteractionData};
use twilight_model::channel::message::MessageFlags;
use twilight_model::guild::Permissions;
use twilight_model::http::interaction::{
    InteractionResponse, InteractionResponseData, InteractionResponseType,
};

/// Build an invocation from slash command data and the invoker's permissions
pub fn invocation_from(data: &CommandData, permissions: Option<Permissions>) -> Invocation {
    let options = data
        .options
        .iter()
        .filter_map(|option| match &option.value {
            CommandOptionValue::String(value) => Some((option.name.clone(), value.clone())),
            _ => None,
        })
        .collect();

    Invocation {
        name: data.name.clone(),
        options,
        is_admin: permissions.is_some_and(|p| p.contains(Permissions::ADMINISTRATOR)),
    }
}

/// Answer one interaction. Non-command interactions are ignored.
pub async fn respond(
    http: &Client,
    interaction: &Interaction,
    service: &TeamService,
) -> Result<(), BotError> {
    let Some(InteractionData::ApplicationCommand(data)) = &interaction.data else {
        debug!(kind = ?interaction.kind, "Ignoring non-command interaction");
        return Ok(());
    };

    let permissions = interaction.member.as_ref().and_then(|member| member.permissions);
    let invocation = invocation_from(data, permissions);
    let client = http.interaction(interaction.application_id);

    // Refusals and bad input are answered at once, without deferring
    let (command, spec) = match Command::parse(&invocation, service.teams()) {
        Ok(parsed) => parsed,
        Err(e) => {
            let reply = reject(&invocation, &e);
            let immediate = InteractionResponse {
                kind: InteractionResponseType::ChannelMessageWithSource,
                data: Some(InteractionResponseData {
                    content: reply.messages.into_iter().next(),
                    flags: reply.ephemeral.then_some(MessageFlags::EPHEMERAL),
                    ..Default::default()
                }),
            };
            client
                .create_response(interaction.id, &interaction.token, &immediate)
                .await
                .map_err(|e| BotError::http("create_response", e))?;
            return Ok(());
        }
    };

    let flags = spec.admin_only.then_some(MessageFlags::EPHEMERAL);
    let deferred = InteractionResponse {
        kind: InteractionResponseType::DeferredChannelMessageWithSource,
        data: Some(InteractionResponseData {
            flags,
            ..Default::default()
        }),
    };
    client
        .create_response(interaction.id, &interaction.token, &deferred)
        .await
        .map_err(|e| BotError::http("create_response", e))?;

    let reply = run(service, command, spec).await;
    let mut messages = reply.messages.iter();

    if let Some(first) = messages.next() {
        client
            .update_response(&interaction.token)
            .content(Some(first.as_str()))
            .await
            .map_err(|e| BotError::http("update_response", e))?;
    }

    for message in messages {
        let mut followup = client.create_followup(&interaction.token).content(message);
        if let Some(flags) = flags {
            followup = followup.flags(flags);
        }
        followup
            .await
            .map_err(|e| BotError::http("create_followup", e))?;
    }

    Ok(())
}
