// Discord event glue - turns gateway message events into engine dispatches.

use crate::core::triggers::MessageEvent;
use crate::discord::executor::SerenityActionExecutor;
use crate::discord::{Data, Error, COMMAND_PREFIX};
use poise::serenity_prelude as serenity;

/// Run one message (new or edited) through the trigger engine.
pub async fn handle_message(
    ctx: &serenity::Context,
    framework: poise::FrameworkContext<'_, Data, Error>,
    msg: &serenity::Message,
    data: &Data,
    is_edit: bool,
) -> Result<(), Error> {
    // Skip bots (including ourselves) and DMs.
    if msg.author.bot {
        return Ok(());
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let channel_nsfw = ctx
        .cache
        .guild(guild_id)
        .and_then(|guild| guild.channels.get(&msg.channel_id).map(|c| c.nsfw))
        .unwrap_or(false);

    let author_roles: Vec<u64> = match &msg.member {
        Some(member) => member.roles.iter().map(|role| role.get()).collect(),
        None => ctx
            .cache
            .guild(guild_id)
            .and_then(|guild| {
                guild
                    .members
                    .get(&msg.author.id)
                    .map(|member| member.roles.iter().map(|role| role.get()).collect())
            })
            .unwrap_or_default(),
    };

    let event = MessageEvent {
        guild_id: guild_id.get(),
        channel_id: msg.channel_id.get(),
        message_id: msg.id.get(),
        author_id: msg.author.id.get(),
        author_roles,
        content: msg.content.clone(),
        attachment_names: msg
            .attachments
            .iter()
            .map(|attachment| attachment.filename.clone())
            .collect(),
        attachment_urls: msg
            .attachments
            .iter()
            .map(|attachment| attachment.url.clone())
            .collect(),
        is_command: msg.content.starts_with(COMMAND_PREFIX),
        is_edit,
        channel_nsfw,
    };

    let executor = SerenityActionExecutor::new(ctx, framework, msg, guild_id);
    let summary = data.dispatch.dispatch(&event, &executor).await;

    if !summary.fired.is_empty() || summary.action_failures > 0 {
        tracing::info!(
            guild_id = event.guild_id,
            fired = ?summary.fired,
            failures = summary.action_failures,
            "trigger dispatch finished"
        );
    }
    Ok(())
}
