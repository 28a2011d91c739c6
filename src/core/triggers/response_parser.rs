// Response spec parsing - turns a `kind;arg;arg` descriptor string into one
// validated, resolved response action.
//
// Resolution and permission lookups go through the ParserContext port so the
// parser itself stays free of Discord types and can be tested with a mock.

use super::trigger_models::{Capability, ResponseAction, ResponseKind, TriggerError};
use async_trait::async_trait;

/// How long the interactive `mock` confirmation waits before rejecting.
pub const CONFIRM_TIMEOUT_SECS: u64 = 15;

/// Outcome of an interactive yes/no prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Approved,
    Denied,
    TimedOut,
}

/// A resolved role reference with its rank in the guild's role hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRef {
    pub id: u64,
    pub rank: i64,
}

/// Everything the parser needs to know about the invoking user, the bot and
/// the guild. Implemented against the live guild state by the Discord layer.
#[async_trait]
pub trait ParserContext: Send + Sync {
    fn actor_has(&self, capability: Capability) -> bool;
    fn bot_has(&self, capability: Capability) -> bool;
    /// Guild owners bypass the role-rank ceiling below.
    fn actor_is_owner(&self) -> bool;
    fn actor_top_role_rank(&self) -> i64;
    fn bot_top_role_rank(&self) -> i64;
    async fn resolve_role(&self, raw: &str) -> Option<RoleRef>;
    /// Resolve to a usable emoji reference (custom emoji ref or validated
    /// unicode symbol).
    async fn resolve_emoji(&self, raw: &str) -> Option<String>;
    /// Present a yes/no choice to the invoking user, resolving within
    /// [`CONFIRM_TIMEOUT_SECS`].
    async fn confirm(&self, prompt: &str) -> Confirmation;
}

/// A successfully parsed response, along with any arguments that failed to
/// resolve and were dropped rather than failing the whole parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub action: ResponseAction,
    pub dropped: Vec<String>,
}

/// Split a descriptor on unescaped `;`. `\;` produces a literal semicolon;
/// empty fields are discarded.
pub fn split_spec(spec: &str) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut chars = spec.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                chars.next();
                fields.last_mut().expect("fields is never empty").push(';');
            }
            ';' => fields.push(String::new()),
            _ => fields.last_mut().expect("fields is never empty").push(c),
        }
    }
    fields.retain(|field| !field.is_empty());
    fields
}

/// Parse one `kind;arg;arg` descriptor into a response action.
///
/// Role and emoji arguments degrade rather than fail: entries that cannot be
/// resolved (or that the actor/bot may not assign) are dropped with a
/// warning, and the parse only fails if nothing valid remains.
pub async fn parse_response_spec(
    spec: &str,
    ctx: &dyn ParserContext,
) -> Result<ParsedResponse, TriggerError> {
    let fields = split_spec(spec);
    let Some(kind_field) = fields.first() else {
        return Err(TriggerError::UnknownActionKind(String::new()));
    };
    // `filter` normalizes to `delete` here, permanently.
    let kind: ResponseKind = kind_field.parse()?;
    let args = &fields[1..];

    if args.is_empty() && kind.requires_args() {
        return Err(TriggerError::MalformedActionArgs(kind));
    }

    if let Some(capability) = kind.required_capability() {
        if !ctx.bot_has(capability) || !ctx.actor_has(capability) {
            return Err(TriggerError::InsufficientPermission { kind, capability });
        }
    }

    if kind == ResponseKind::Mock {
        let prompt = "Mock responses let any user run a command as if you ran it. \
                      Are you sure you want to add this?";
        match ctx.confirm(prompt).await {
            Confirmation::Approved => {}
            Confirmation::Denied | Confirmation::TimedOut => {
                return Err(TriggerError::NotConfirmed);
            }
        }
    }

    let mut dropped = Vec::new();
    let action = match kind {
        ResponseKind::Text => ResponseAction::Text {
            content: args.join(";"),
        },
        ResponseKind::Dm => ResponseAction::Dm {
            content: args.join(";"),
        },
        ResponseKind::DmMe => ResponseAction::DmMe {
            content: args.join(";"),
        },
        ResponseKind::Rename => ResponseAction::Rename {
            name: args.join(";"),
        },
        ResponseKind::Command => ResponseAction::Command {
            command: args.join(";"),
        },
        ResponseKind::Mock => ResponseAction::Mock {
            command: args.join(";"),
        },
        ResponseKind::Ban => ResponseAction::Ban,
        ResponseKind::Kick => ResponseAction::Kick,
        ResponseKind::Delete => ResponseAction::Delete,
        ResponseKind::Publish => ResponseAction::Publish,
        ResponseKind::AddRole | ResponseKind::RemoveRole => {
            let roles = resolve_roles(args, ctx, &mut dropped).await;
            if roles.is_empty() {
                return Err(TriggerError::MalformedActionArgs(kind));
            }
            if kind == ResponseKind::AddRole {
                ResponseAction::AddRole { roles }
            } else {
                ResponseAction::RemoveRole { roles }
            }
        }
        ResponseKind::React => {
            let mut emojis = Vec::new();
            for raw in args {
                match ctx.resolve_emoji(raw).await {
                    Some(emoji) => emojis.push(emoji),
                    None => {
                        tracing::warn!(emoji = raw.as_str(), "emoji not found, dropping");
                        dropped.push(raw.clone());
                    }
                }
            }
            if emojis.is_empty() {
                return Err(TriggerError::MalformedActionArgs(kind));
            }
            ResponseAction::React { emojis }
        }
    };

    Ok(ParsedResponse { action, dropped })
}

/// A role survives only if it resolves and sits strictly below both the
/// bot's and the actor's highest role (owner bypasses the actor check).
async fn resolve_roles(
    args: &[String],
    ctx: &dyn ParserContext,
    dropped: &mut Vec<String>,
) -> Vec<u64> {
    let mut roles = Vec::new();
    for raw in args {
        match ctx.resolve_role(raw).await {
            Some(role)
                if role.rank < ctx.bot_top_role_rank()
                    && (ctx.actor_is_owner() || role.rank < ctx.actor_top_role_rank()) =>
            {
                roles.push(role.id);
            }
            Some(_) => {
                tracing::warn!(
                    role = raw.as_str(),
                    "role outranks the actor or the bot, dropping"
                );
                dropped.push(raw.clone());
            }
            None => {
                tracing::warn!(role = raw.as_str(), "role not found, dropping");
                dropped.push(raw.clone());
            }
        }
    }
    roles
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockContext {
        actor_capabilities: Vec<Capability>,
        bot_capabilities: Vec<Capability>,
        actor_is_owner: bool,
        actor_top_rank: i64,
        bot_top_rank: i64,
        roles: HashMap<String, RoleRef>,
        emojis: Vec<String>,
        confirmation: Confirmation,
    }

    impl MockContext {
        fn permissive() -> Self {
            Self {
                actor_capabilities: vec![
                    Capability::ManageRoles,
                    Capability::ManageMessages,
                    Capability::BanMembers,
                    Capability::KickMembers,
                    Capability::AddReactions,
                    Capability::ManageNicknames,
                ],
                bot_capabilities: vec![
                    Capability::ManageRoles,
                    Capability::ManageMessages,
                    Capability::BanMembers,
                    Capability::KickMembers,
                    Capability::AddReactions,
                    Capability::ManageNicknames,
                ],
                actor_is_owner: false,
                actor_top_rank: 10,
                bot_top_rank: 10,
                roles: HashMap::from([(
                    "Moderator".to_string(),
                    RoleRef {
                        id: 555,
                        rank: 5,
                    },
                )]),
                emojis: vec!["👍".to_string()],
                confirmation: Confirmation::Approved,
            }
        }
    }

    #[async_trait]
    impl ParserContext for MockContext {
        fn actor_has(&self, capability: Capability) -> bool {
            self.actor_capabilities.contains(&capability)
        }

        fn bot_has(&self, capability: Capability) -> bool {
            self.bot_capabilities.contains(&capability)
        }

        fn actor_is_owner(&self) -> bool {
            self.actor_is_owner
        }

        fn actor_top_role_rank(&self) -> i64 {
            self.actor_top_rank
        }

        fn bot_top_role_rank(&self) -> i64 {
            self.bot_top_rank
        }

        async fn resolve_role(&self, raw: &str) -> Option<RoleRef> {
            self.roles.get(raw).copied()
        }

        async fn resolve_emoji(&self, raw: &str) -> Option<String> {
            self.emojis.contains(&raw.to_string()).then(|| raw.to_string())
        }

        async fn confirm(&self, _prompt: &str) -> Confirmation {
            self.confirmation
        }
    }

    #[tokio::test]
    async fn unknown_kind_is_rejected() {
        let ctx = MockContext::permissive();
        let result = parse_response_spec("frobnicate;arg", &ctx).await;
        assert!(matches!(
            result,
            Err(TriggerError::UnknownActionKind(kind)) if kind == "frobnicate"
        ));
    }

    #[tokio::test]
    async fn filter_normalizes_to_delete_without_arguments() {
        let ctx = MockContext::permissive();
        let parsed = parse_response_spec("filter", &ctx).await.unwrap();
        assert_eq!(parsed.action, ResponseAction::Delete);
        assert!(parsed.dropped.is_empty());
    }

    #[tokio::test]
    async fn argument_requiring_kind_without_arguments_is_malformed() {
        let ctx = MockContext::permissive();
        let result = parse_response_spec("text", &ctx).await;
        assert!(matches!(
            result,
            Err(TriggerError::MalformedActionArgs(ResponseKind::Text))
        ));
    }

    #[tokio::test]
    async fn missing_bot_capability_is_rejected() {
        let mut ctx = MockContext::permissive();
        ctx.bot_capabilities.retain(|c| *c != Capability::BanMembers);
        let result = parse_response_spec("ban", &ctx).await;
        assert!(matches!(
            result,
            Err(TriggerError::InsufficientPermission {
                kind: ResponseKind::Ban,
                capability: Capability::BanMembers,
            })
        ));
    }

    #[tokio::test]
    async fn missing_actor_capability_is_rejected() {
        let mut ctx = MockContext::permissive();
        ctx.actor_capabilities
            .retain(|c| *c != Capability::ManageRoles);
        let result = parse_response_spec("add_role;Moderator", &ctx).await;
        assert!(matches!(
            result,
            Err(TriggerError::InsufficientPermission {
                kind: ResponseKind::AddRole,
                capability: Capability::ManageRoles,
            })
        ));
    }

    #[tokio::test]
    async fn unresolvable_roles_degrade_to_the_valid_subset() {
        let ctx = MockContext::permissive();
        let parsed = parse_response_spec("add_role;Moderator;Nonexistent", &ctx)
            .await
            .unwrap();
        assert_eq!(parsed.action, ResponseAction::AddRole { roles: vec![555] });
        assert_eq!(parsed.dropped, vec!["Nonexistent".to_string()]);
    }

    #[tokio::test]
    async fn role_spec_with_nothing_valid_is_malformed() {
        let ctx = MockContext::permissive();
        let result = parse_response_spec("add_role;Nonexistent", &ctx).await;
        assert!(matches!(
            result,
            Err(TriggerError::MalformedActionArgs(ResponseKind::AddRole))
        ));
    }

    #[tokio::test]
    async fn role_outranking_the_actor_is_dropped() {
        let mut ctx = MockContext::permissive();
        ctx.actor_top_rank = 3;
        let result = parse_response_spec("add_role;Moderator", &ctx).await;
        assert!(matches!(
            result,
            Err(TriggerError::MalformedActionArgs(ResponseKind::AddRole))
        ));

        // The guild owner bypasses the actor-rank ceiling.
        ctx.actor_is_owner = true;
        let parsed = parse_response_spec("add_role;Moderator", &ctx).await.unwrap();
        assert_eq!(parsed.action, ResponseAction::AddRole { roles: vec![555] });
    }

    #[tokio::test]
    async fn react_drops_unknown_emoji_but_keeps_the_rest() {
        let ctx = MockContext::permissive();
        let parsed = parse_response_spec("react;👍;mystery_emoji", &ctx)
            .await
            .unwrap();
        assert_eq!(
            parsed.action,
            ResponseAction::React {
                emojis: vec!["👍".to_string()]
            }
        );
        assert_eq!(parsed.dropped, vec!["mystery_emoji".to_string()]);
    }

    #[tokio::test]
    async fn mock_requires_confirmation() {
        let mut ctx = MockContext::permissive();
        ctx.confirmation = Confirmation::TimedOut;
        let result = parse_response_spec("mock;ping", &ctx).await;
        assert!(matches!(result, Err(TriggerError::NotConfirmed)));

        ctx.confirmation = Confirmation::Denied;
        let result = parse_response_spec("mock;ping", &ctx).await;
        assert!(matches!(result, Err(TriggerError::NotConfirmed)));

        ctx.confirmation = Confirmation::Approved;
        let parsed = parse_response_spec("mock;ping", &ctx).await.unwrap();
        assert_eq!(
            parsed.action,
            ResponseAction::Mock {
                command: "ping".to_string()
            }
        );
    }

    #[test]
    fn escaped_semicolons_stay_in_one_field() {
        assert_eq!(
            split_spec(r"text;left\;right"),
            vec!["text".to_string(), "left;right".to_string()]
        );
        assert_eq!(split_spec("delete"), vec!["delete".to_string()]);
        assert_eq!(
            split_spec("react;👍;👎"),
            vec!["react".to_string(), "👍".to_string(), "👎".to_string()]
        );
    }

    #[tokio::test]
    async fn escaped_semicolon_reaches_the_text_content() {
        let ctx = MockContext::permissive();
        let parsed = parse_response_spec(r"text;a\;b", &ctx).await.unwrap();
        assert_eq!(
            parsed.action,
            ResponseAction::Text {
                content: "a;b".to_string()
            }
        );
    }
}
