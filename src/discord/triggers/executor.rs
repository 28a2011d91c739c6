// Serenity-backed action execution - translates response actions into
// Discord API calls against the message that fired the trigger.
//
// One executor is built per inbound event; failures map into ActionError
// so the engine can isolate them per action.

use crate::core::triggers::{ActionError, ActionExecutor, ResponseKind, SendOptions};
use crate::discord::resolver::parse_custom_emoji;
use crate::discord::{Data, Error, COMMAND_PREFIX};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;

pub struct SerenityActionExecutor<'a> {
    ctx: &'a serenity::Context,
    framework: poise::FrameworkContext<'a, Data, Error>,
    msg: &'a serenity::Message,
    guild_id: serenity::GuildId,
}

impl<'a> SerenityActionExecutor<'a> {
    pub fn new(
        ctx: &'a serenity::Context,
        framework: poise::FrameworkContext<'a, Data, Error>,
        msg: &'a serenity::Message,
        guild_id: serenity::GuildId,
    ) -> Self {
        Self {
            ctx,
            framework,
            msg,
            guild_id,
        }
    }
}

fn action_error(kind: ResponseKind) -> impl Fn(serenity::Error) -> ActionError {
    move |e| ActionError::new(kind, e.to_string())
}

/// Stored emoji refs are either `<a:name:id>` custom syntax or a plain
/// unicode symbol.
fn reaction_from_stored(stored: &str) -> serenity::ReactionType {
    match parse_custom_emoji(stored) {
        Some((animated, name, id)) => serenity::ReactionType::Custom {
            animated,
            id: serenity::EmojiId::new(id),
            name: Some(name),
        },
        None => serenity::ReactionType::Unicode(stored.to_string()),
    }
}

#[async_trait]
impl ActionExecutor for SerenityActionExecutor<'_> {
    async fn send_text(&self, content: &str, options: &SendOptions) -> Result<(), ActionError> {
        let mentions = serenity::CreateAllowedMentions::new()
            .all_users(options.mentions.users)
            .all_roles(options.mentions.roles)
            .everyone(options.mentions.everyone)
            .replied_user(options.mentions.replied_user);
        let mut builder = serenity::CreateMessage::new()
            .content(content)
            .tts(options.tts)
            .allowed_mentions(mentions);
        if options.reply {
            builder = builder.reference_message(self.msg);
        }

        let sent = self
            .msg
            .channel_id
            .send_message(&self.ctx.http, builder)
            .await
            .map_err(action_error(ResponseKind::Text))?;

        if let Some(seconds) = options.delete_after {
            let http = self.ctx.http.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;
                if let Err(e) = sent.delete(&http).await {
                    tracing::warn!("failed to delete trigger response: {e}");
                }
            });
        }
        Ok(())
    }

    async fn delete_message(&self) -> Result<(), ActionError> {
        self.msg
            .delete(&self.ctx.http)
            .await
            .map_err(action_error(ResponseKind::Delete))
    }

    async fn ban_author(&self, reason: &str) -> Result<(), ActionError> {
        self.guild_id
            .ban_with_reason(&self.ctx.http, self.msg.author.id, 0, reason)
            .await
            .map_err(action_error(ResponseKind::Ban))
    }

    async fn kick_author(&self, reason: &str) -> Result<(), ActionError> {
        self.guild_id
            .kick_with_reason(&self.ctx.http, self.msg.author.id, reason)
            .await
            .map_err(action_error(ResponseKind::Kick))
    }

    async fn add_roles(&self, roles: &[u64]) -> Result<(), ActionError> {
        for role in roles {
            self.ctx
                .http
                .add_member_role(
                    self.guild_id,
                    self.msg.author.id,
                    serenity::RoleId::new(*role),
                    Some("Trigger response"),
                )
                .await
                .map_err(action_error(ResponseKind::AddRole))?;
        }
        Ok(())
    }

    async fn remove_roles(&self, roles: &[u64]) -> Result<(), ActionError> {
        for role in roles {
            self.ctx
                .http
                .remove_member_role(
                    self.guild_id,
                    self.msg.author.id,
                    serenity::RoleId::new(*role),
                    Some("Trigger response"),
                )
                .await
                .map_err(action_error(ResponseKind::RemoveRole))?;
        }
        Ok(())
    }

    async fn react(&self, emojis: &[String]) -> Result<(), ActionError> {
        for emoji in emojis {
            self.msg
                .react(&self.ctx.http, reaction_from_stored(emoji))
                .await
                .map_err(action_error(ResponseKind::React))?;
        }
        Ok(())
    }

    async fn rename_author(&self, nickname: &str) -> Result<(), ActionError> {
        self.guild_id
            .edit_member(
                &self.ctx.http,
                self.msg.author.id,
                serenity::EditMember::new().nickname(nickname),
            )
            .await
            .map(|_| ())
            .map_err(action_error(ResponseKind::Rename))
    }

    async fn dm_author(&self, content: &str) -> Result<(), ActionError> {
        self.msg
            .author
            .dm(
                &self.ctx.http,
                serenity::CreateMessage::new().content(content),
            )
            .await
            .map(|_| ())
            .map_err(action_error(ResponseKind::Dm))
    }

    async fn dm_user(&self, user_id: u64, content: &str) -> Result<(), ActionError> {
        let user = serenity::UserId::new(user_id)
            .to_user(self.ctx)
            .await
            .map_err(action_error(ResponseKind::DmMe))?;
        user.dm(
            &self.ctx.http,
            serenity::CreateMessage::new().content(content),
        )
        .await
        .map(|_| ())
        .map_err(action_error(ResponseKind::DmMe))
    }

    async fn publish_message(&self) -> Result<(), ActionError> {
        self.msg
            .crosspost(&self.ctx.http)
            .await
            .map(|_| ())
            .map_err(action_error(ResponseKind::Publish))
    }

    /// Re-dispatch the configured command through the framework as if
    /// `user_id` had sent it in this channel.
    async fn run_command(&self, user_id: u64, command: &str) -> Result<(), ActionError> {
        let kind = ResponseKind::Command;
        let user = serenity::UserId::new(user_id)
            .to_user(self.ctx)
            .await
            .map_err(action_error(kind))?;

        let mut proxy = self.msg.clone();
        proxy.author = user;
        proxy.content = format!("{COMMAND_PREFIX}{command}");
        proxy.webhook_id = None;

        let invocation_data =
            tokio::sync::Mutex::new(Box::new(()) as Box<dyn std::any::Any + Send + Sync>);
        let mut parent_commands = Vec::new();
        poise::dispatch_message(
            self.framework,
            self.ctx,
            &proxy,
            poise::MessageDispatchTrigger::MessageCreate,
            &invocation_data,
            &mut parent_commands,
        )
        .await
        .map_err(|e| ActionError::new(kind, e.to_string()))
    }
}
