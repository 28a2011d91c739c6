// Trigger management commands.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - no business logic, just translation.

use crate::core::triggers::{
    parse_response_spec, Cooldown, CooldownScope, DispatchEngine, Payload, ResponseAction,
    ResponseKind, Trigger, TriggerService,
};
use crate::discord::resolver::{resolve_scope_id, SerenityParserContext};
use crate::infra::triggers::SqliteTriggerStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Shared state injected into every command and event handler.
pub struct Data {
    pub triggers: Arc<TriggerService<SqliteTriggerStore>>,
    pub dispatch: Arc<DispatchEngine<SqliteTriggerStore>>,
}

type Context<'a> = poise::Context<'a, Data, Error>;

/// Where a cooldown window is tracked.
#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum CooldownStyleChoice {
    #[name = "guild"]
    Guild,
    #[name = "channel"]
    Channel,
    #[name = "member"]
    Member,
}

impl From<CooldownStyleChoice> for CooldownScope {
    fn from(choice: CooldownStyleChoice) -> Self {
        match choice {
            CooldownStyleChoice::Guild => CooldownScope::Guild,
            CooldownStyleChoice::Channel => CooldownScope::Channel,
            CooldownStyleChoice::Member => CooldownScope::Member,
        }
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ListEdit {
    #[name = "add"]
    Add,
    #[name = "remove"]
    Remove,
}

/// Manage message triggers for this server.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands(
        "list",
        "info",
        "add",
        "multi",
        "remove",
        "toggle",
        "chance",
        "cooldown",
        "allowlist",
        "denylist",
        "text",
        "resetcount"
    ),
    required_permissions = "MANAGE_MESSAGES",
    guild_only
)]
pub async fn trigger(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// List every trigger in this server.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let triggers = ctx
        .data()
        .triggers
        .triggers_for(guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if triggers.is_empty() {
        ctx.say("No triggers are set up yet.").await?;
        return Ok(());
    }

    let lines: Vec<String> = triggers
        .iter()
        .map(|t| {
            let state = if t.enabled { "✅" } else { "💤" };
            let kinds = t
                .response_type
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{state} `{}` • fired {} times • [{kinds}]", t.name, t.count)
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("📋 Triggers")
        .description(lines.join("\n"))
        .color(0x5865F2);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show one trigger in detail.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Trigger name"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let trigger = ctx
        .data()
        .triggers
        .get(guild_id.get(), &name)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    ctx.say(trigger.to_string()).await?;
    Ok(())
}

/// Create a trigger that replies with text.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Unique trigger name"] name: String,
    #[description = "Regex pattern to match"] pattern: String,
    #[description = "Text to reply with"] response: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let mut trigger = Trigger::new(
        &name,
        &pattern,
        vec![ResponseKind::Text],
        ctx.author().id.get(),
    )
    .map_err(|e| Error::from(e.to_string()))?;
    trigger.text = Some(Payload::Single(response.clone()));
    trigger.multi_payload = vec![ResponseAction::Text { content: response }];

    ctx.data()
        .triggers
        .create(guild_id.get(), trigger)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    ctx.say(format!("✅ Trigger `{name}` created.")).await?;
    Ok(())
}

/// Create a trigger with multiple responses, e.g.
/// `delete | add_role;Muted | text;calm down`.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn multi(
    ctx: Context<'_>,
    #[description = "Unique trigger name"] name: String,
    #[description = "Regex pattern to match"] pattern: String,
    #[description = "Responses as `kind;arg;arg`, separated by `|`"] responses: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let parser_ctx = SerenityParserContext::gather(ctx).await?;
    let mut actions = Vec::new();
    let mut dropped = Vec::new();
    for descriptor in responses.split('|').map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = parse_response_spec(descriptor, &parser_ctx)
            .await
            .map_err(|e| Error::from(e.to_string()))?;
        dropped.extend(parsed.dropped);
        actions.push(parsed.action);
    }
    if actions.is_empty() {
        ctx.say("❌ Provide at least one response, e.g. `delete` or `text;hello`.")
            .await?;
        return Ok(());
    }

    let kinds = actions.iter().map(ResponseAction::kind).collect();
    let mut trigger = Trigger::new(&name, &pattern, kinds, ctx.author().id.get())
        .map_err(|e| Error::from(e.to_string()))?;
    trigger.multi_payload = actions;

    ctx.data()
        .triggers
        .create(guild_id.get(), trigger)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let mut reply = format!("✅ Trigger `{name}` created.");
    if !dropped.is_empty() {
        reply.push_str(&format!(
            "\n⚠️ Skipped arguments that could not be resolved: {}",
            dropped.join(", ")
        ));
    }
    ctx.say(reply).await?;
    Ok(())
}

/// Delete a trigger permanently.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Trigger name"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    ctx.data()
        .triggers
        .remove(guild_id.get(), &name)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    ctx.say(format!("🗑️ Trigger `{name}` removed.")).await?;
    Ok(())
}

/// Enable or disable a trigger without deleting it.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn toggle(
    ctx: Context<'_>,
    #[description = "Trigger name"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let enabled = ctx
        .data()
        .triggers
        .toggle(guild_id.get(), &name)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let state = if enabled { "enabled" } else { "disabled" };
    ctx.say(format!("✅ Trigger `{name}` is now **{state}**."))
        .await?;
    Ok(())
}

/// Set the percent chance a matching message actually fires.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn chance(
    ctx: Context<'_>,
    #[description = "Trigger name"] name: String,
    #[description = "Percent chance 0-100; omit to always fire"] percent: Option<u8>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    if let Some(p) = percent {
        if p > 100 {
            ctx.say("❌ Chance must be between 0 and 100.").await?;
            return Ok(());
        }
    }

    ctx.data()
        .triggers
        .update(guild_id.get(), &name, |t| t.chance = percent)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    match percent {
        Some(p) => {
            ctx.say(format!("🎲 Trigger `{name}` now fires {p}% of the time."))
                .await?
        }
        None => {
            ctx.say(format!("🎲 Trigger `{name}` now always fires."))
                .await?
        }
    };
    Ok(())
}

/// Rate-limit how often a trigger may fire.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn cooldown(
    ctx: Context<'_>,
    #[description = "Trigger name"] name: String,
    #[description = "Window in seconds; 0 clears the cooldown"] seconds: u64,
    #[description = "Track the window per guild, channel or member"] style: CooldownStyleChoice,
    #[description = "Fires allowed per window (default: 1)"] max_fires: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let cooldown = (seconds > 0).then(|| Cooldown {
        seconds,
        max_fires: max_fires.unwrap_or(1),
        scope: style.into(),
    });

    ctx.data()
        .triggers
        .update(guild_id.get(), &name, |t| t.cooldown = cooldown)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    match cooldown {
        Some(c) => {
            ctx.say(format!(
                "⏳ Trigger `{name}` limited to {} fire(s) per {}s, tracked per {}.",
                c.max_fires, c.seconds, c.scope
            ))
            .await?
        }
        None => ctx.say(format!("⏳ Cooldown cleared for `{name}`.")).await?,
    };
    Ok(())
}

/// Restrict a trigger to certain channels, roles or members.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn allowlist(
    ctx: Context<'_>,
    #[description = "Trigger name"] name: String,
    #[description = "Add or remove"] edit: ListEdit,
    #[description = "Channel, role or member (mention, id or name)"] target: String,
) -> Result<(), Error> {
    edit_scope_list(ctx, name, edit, target, ListKind::Allow).await
}

/// Block a trigger in certain channels or for certain roles/members.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn denylist(
    ctx: Context<'_>,
    #[description = "Trigger name"] name: String,
    #[description = "Add or remove"] edit: ListEdit,
    #[description = "Channel, role or member (mention, id or name)"] target: String,
) -> Result<(), Error> {
    edit_scope_list(ctx, name, edit, target, ListKind::Deny).await
}

#[derive(Clone, Copy)]
enum ListKind {
    Allow,
    Deny,
}

/// Shared logic for the allowlist and denylist commands.
async fn edit_scope_list(
    ctx: Context<'_>,
    name: String,
    edit: ListEdit,
    target: String,
    kind: ListKind,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let Some(scope_id) = resolve_scope_id(ctx.serenity_context(), guild_id, &target) else {
        ctx.say(format!(
            "❌ `{target}` is not a channel, role or member of this server."
        ))
        .await?;
        return Ok(());
    };

    ctx.data()
        .triggers
        .update(guild_id.get(), &name, |t| {
            let entries = match kind {
                ListKind::Allow => &mut t.whitelist,
                ListKind::Deny => &mut t.blacklist,
            };
            match edit {
                ListEdit::Add => {
                    if !entries.contains(&scope_id) {
                        entries.push(scope_id);
                    }
                }
                ListEdit::Remove => entries.retain(|id| *id != scope_id),
            }
        })
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let list_name = match kind {
        ListKind::Allow => "allowlist",
        ListKind::Deny => "denylist",
    };
    let verb = match edit {
        ListEdit::Add => "added to",
        ListEdit::Remove => "removed from",
    };
    ctx.say(format!("✅ `{target}` {verb} the {list_name} of `{name}`."))
        .await?;
    Ok(())
}

/// Replace or extend a trigger's reply text.
///
/// With `append`, the new line joins the pool and one entry is chosen at
/// random per firing.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn text(
    ctx: Context<'_>,
    #[description = "Trigger name"] name: String,
    #[description = "Reply text"] response: String,
    #[description = "Add to the existing pool instead of replacing"] append: Option<bool>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let append = append.unwrap_or(false);
    let new_entry = response.clone();

    ctx.data()
        .triggers
        .update(guild_id.get(), &name, move |t| {
            let mut entries = if append {
                t.text.take().map(|p| p.entries()).unwrap_or_default()
            } else {
                Vec::new()
            };
            entries.push(new_entry);
            t.text = Some(match entries.len() {
                1 => Payload::Single(entries.remove(0)),
                _ => Payload::Many(entries),
            });
        })
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let verb = if append { "extended with" } else { "set to" };
    ctx.say(format!("✏️ Reply text for `{name}` {verb} `{response}`."))
        .await?;
    Ok(())
}

/// Reset a trigger's fire counter to zero.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn resetcount(
    ctx: Context<'_>,
    #[description = "Trigger name"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    ctx.data()
        .triggers
        .reset_count(guild_id.get(), &name)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    ctx.say(format!("🔁 Counter for `{name}` reset to 0."))
        .await?;
    Ok(())
}
