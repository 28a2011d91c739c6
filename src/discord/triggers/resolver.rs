// Resolution and permission lookups against the live guild state.
//
// The parser core only sees the ParserContext trait; this file implements
// it by snapshotting the cached guild (roles, emojis, permissions) at
// command time, since cache references cannot be held across await points.

use crate::core::triggers::{
    Capability, Confirmation, ParserContext, RoleRef, CONFIRM_TIMEOUT_SECS,
};
use crate::discord::{Data, Error};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::time::Duration;

#[derive(Debug, Clone)]
struct RoleSnapshot {
    id: u64,
    name: String,
    rank: i64,
}

#[derive(Debug, Clone)]
struct EmojiSnapshot {
    id: u64,
    name: String,
    animated: bool,
}

/// Everything the response spec parser asks about the invoking user, the
/// bot and the guild, captured once per command invocation.
pub struct SerenityParserContext<'a> {
    ctx: &'a serenity::Context,
    channel_id: serenity::ChannelId,
    actor_id: serenity::UserId,
    /// The invoking message, when there is one (prefix invocations). Used
    /// as the target for the unicode emoji reachability probe.
    probe_message: Option<&'a serenity::Message>,
    actor_perms: serenity::Permissions,
    bot_perms: serenity::Permissions,
    actor_top_rank: i64,
    bot_top_rank: i64,
    owner: bool,
    roles: Vec<RoleSnapshot>,
    emojis: Vec<EmojiSnapshot>,
}

impl<'a> SerenityParserContext<'a> {
    pub async fn gather(ctx: poise::Context<'a, Data, Error>) -> Result<Self, Error> {
        let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
        let serenity_ctx = ctx.serenity_context();
        let bot_id = serenity_ctx.cache.current_user().id;

        // Members are fetched before the cache guard opens: guild refs must
        // not be held across await points.
        let actor_member = ctx
            .author_member()
            .await
            .ok_or("Could not resolve your guild membership")?;
        let bot_member = guild_id.member(serenity_ctx, bot_id).await?;

        let (actor_perms, bot_perms, actor_top_rank, bot_top_rank, owner, roles, emojis) = {
            let guild = serenity_ctx
                .cache
                .guild(guild_id)
                .ok_or("Guild is not cached")?;
            let channel = guild
                .channels
                .get(&ctx.channel_id())
                .ok_or("Channel is not cached")?;

            let top_rank = |member: &serenity::Member| -> i64 {
                member
                    .roles
                    .iter()
                    .filter_map(|role_id| guild.roles.get(role_id))
                    .map(|role| i64::from(role.position))
                    .max()
                    .unwrap_or(0)
            };

            let roles = guild
                .roles
                .values()
                .map(|role| RoleSnapshot {
                    id: role.id.get(),
                    name: role.name.clone(),
                    rank: i64::from(role.position),
                })
                .collect();
            let emojis = guild
                .emojis
                .values()
                .map(|emoji| EmojiSnapshot {
                    id: emoji.id.get(),
                    name: emoji.name.clone(),
                    animated: emoji.animated,
                })
                .collect();

            (
                guild.user_permissions_in(channel, &actor_member),
                guild.user_permissions_in(channel, &bot_member),
                top_rank(&actor_member),
                top_rank(&bot_member),
                guild.owner_id == actor_member.user.id,
                roles,
                emojis,
            )
        };

        let probe_message = match ctx {
            poise::Context::Prefix(prefix) => Some(prefix.msg),
            poise::Context::Application(_) => None,
        };

        Ok(Self {
            ctx: serenity_ctx,
            channel_id: ctx.channel_id(),
            actor_id: ctx.author().id,
            probe_message,
            actor_perms,
            bot_perms,
            actor_top_rank,
            bot_top_rank,
            owner,
            roles,
            emojis,
        })
    }

    /// Last-resort emoji check: try to actually use it as a reaction.
    async fn probe_emoji(&self, raw: &str) -> Option<String> {
        let Some(message) = self.probe_message else {
            // No message to probe against (slash invocation); accept plain
            // unicode candidates and reject anything ascii.
            return (!raw.is_empty() && raw.chars().all(|c| !c.is_ascii()))
                .then(|| raw.to_string());
        };
        let reaction = serenity::ReactionType::try_from(raw).ok()?;
        match message.react(&self.ctx.http, reaction).await {
            Ok(_) => Some(raw.to_string()),
            Err(_) => None,
        }
    }
}

#[async_trait]
impl ParserContext for SerenityParserContext<'_> {
    fn actor_has(&self, capability: Capability) -> bool {
        has_capability(self.actor_perms, capability)
    }

    fn bot_has(&self, capability: Capability) -> bool {
        has_capability(self.bot_perms, capability)
    }

    fn actor_is_owner(&self) -> bool {
        self.owner
    }

    fn actor_top_role_rank(&self) -> i64 {
        self.actor_top_rank
    }

    fn bot_top_role_rank(&self) -> i64 {
        self.bot_top_rank
    }

    async fn resolve_role(&self, raw: &str) -> Option<RoleRef> {
        let by_id = parse_role_mention(raw).or_else(|| raw.parse::<u64>().ok());
        let snapshot = match by_id {
            Some(id) => self.roles.iter().find(|role| role.id == id),
            None => self.roles.iter().find(|role| role.name == raw),
        };
        snapshot.map(|role| RoleRef {
            id: role.id,
            rank: role.rank,
        })
    }

    async fn resolve_emoji(&self, raw: &str) -> Option<String> {
        if let Some((animated, name, id)) = parse_custom_emoji(raw) {
            if self.emojis.iter().any(|emoji| emoji.id == id) {
                return Some(format_custom_emoji(animated, &name, id));
            }
            // Not one of this guild's; the probe below decides whether the
            // bot can still use it.
        } else if let Ok(id) = raw.parse::<u64>() {
            if let Some(emoji) = self.emojis.iter().find(|emoji| emoji.id == id) {
                return Some(format_custom_emoji(emoji.animated, &emoji.name, emoji.id));
            }
        } else {
            let name = raw.trim_matches(':');
            if let Some(emoji) = self.emojis.iter().find(|emoji| emoji.name == name) {
                return Some(format_custom_emoji(emoji.animated, &emoji.name, emoji.id));
            }
        }
        self.probe_emoji(raw).await
    }

    async fn confirm(&self, prompt: &str) -> Confirmation {
        let prompt_message = match self.channel_id.say(&self.ctx.http, prompt).await {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("failed to send confirmation prompt: {e}");
                return Confirmation::TimedOut;
            }
        };
        for emoji in ['✅', '❌'] {
            if let Err(e) = prompt_message.react(&self.ctx.http, emoji).await {
                tracing::warn!("failed to seed confirmation reaction: {e}");
            }
        }

        let reaction = prompt_message
            .await_reaction(&self.ctx.shard)
            .author_id(self.actor_id)
            .timeout(Duration::from_secs(CONFIRM_TIMEOUT_SECS))
            .await;
        match reaction {
            Some(reaction) if reaction.emoji.unicode_eq("✅") => Confirmation::Approved,
            Some(_) => Confirmation::Denied,
            None => Confirmation::TimedOut,
        }
    }
}

fn has_capability(perms: serenity::Permissions, capability: Capability) -> bool {
    match capability {
        Capability::ManageRoles => perms.manage_roles(),
        Capability::ManageMessages => perms.manage_messages(),
        Capability::BanMembers => perms.ban_members(),
        Capability::KickMembers => perms.kick_members(),
        Capability::AddReactions => perms.add_reactions(),
        Capability::ManageNicknames => perms.manage_nicknames(),
    }
}

/// Parse `<a:name:id>` / `<:name:id>` custom emoji syntax.
pub fn parse_custom_emoji(raw: &str) -> Option<(bool, String, u64)> {
    let inner = raw.strip_prefix('<')?.strip_suffix('>')?;
    let mut parts = inner.split(':');
    let animated = match parts.next()? {
        "a" => true,
        "" => false,
        _ => return None,
    };
    let name = parts.next()?;
    let id = parts.next()?.parse().ok()?;
    if parts.next().is_some() || name.is_empty() {
        return None;
    }
    Some((animated, name.to_string(), id))
}

pub fn format_custom_emoji(animated: bool, name: &str, id: u64) -> String {
    if animated {
        format!("<a:{name}:{id}>")
    } else {
        format!("<:{name}:{id}>")
    }
}

fn parse_role_mention(raw: &str) -> Option<u64> {
    raw.strip_prefix("<@&")?.strip_suffix('>')?.parse().ok()
}

/// Resolve a channel, role or member reference (mention, raw id, or name)
/// to its id, for the allow/deny list commands. Lookup order on name
/// collisions: channel, then role, then member.
pub fn resolve_scope_id(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    raw: &str,
) -> Option<u64> {
    let guild = ctx.cache.guild(guild_id)?;

    if let Some(id) = parse_any_mention(raw).or_else(|| raw.parse::<u64>().ok()) {
        if id == 0 {
            return None;
        }
        let known = guild.channels.contains_key(&serenity::ChannelId::new(id))
            || guild.roles.contains_key(&serenity::RoleId::new(id))
            || guild.members.contains_key(&serenity::UserId::new(id));
        return known.then_some(id);
    }

    if let Some(channel) = guild.channels.values().find(|c| c.name == raw) {
        return Some(channel.id.get());
    }
    if let Some(role) = guild.roles.values().find(|r| r.name == raw) {
        return Some(role.id.get());
    }
    guild
        .members
        .values()
        .find(|m| m.user.name == raw || m.nick.as_deref() == Some(raw))
        .map(|m| m.user.id.get())
}

fn parse_any_mention(raw: &str) -> Option<u64> {
    let inner = raw.strip_prefix('<')?.strip_suffix('>')?;
    inner.trim_start_matches(['#', '@', '!', '&']).parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_emoji_syntax_parses() {
        assert_eq!(
            parse_custom_emoji("<:blob:12345>"),
            Some((false, "blob".to_string(), 12345))
        );
        assert_eq!(
            parse_custom_emoji("<a:party:99>"),
            Some((true, "party".to_string(), 99))
        );
        assert_eq!(parse_custom_emoji("👍"), None);
        assert_eq!(parse_custom_emoji("<:missing_id:>"), None);
        assert_eq!(parse_custom_emoji("<@&123>"), None);
    }

    #[test]
    fn custom_emoji_formats_back() {
        assert_eq!(format_custom_emoji(false, "blob", 12345), "<:blob:12345>");
        assert_eq!(format_custom_emoji(true, "party", 99), "<a:party:99>");
    }

    #[test]
    fn mentions_strip_to_ids() {
        assert_eq!(parse_any_mention("<#111>"), Some(111));
        assert_eq!(parse_any_mention("<@222>"), Some(222));
        assert_eq!(parse_any_mention("<@!333>"), Some(333));
        assert_eq!(parse_any_mention("<@&444>"), Some(444));
        assert_eq!(parse_any_mention("plain"), None);
    }
}
