// Trigger domain models - the trigger entity, its response actions, and the
// persisted document form.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts response actions into Discord API calls.

use super::pattern::TriggerPattern;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised while creating or editing a trigger.
///
/// These are surfaced synchronously to the invoking user; a trigger that
/// fails any of these checks is never persisted.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("`{pattern}` is not a valid regex pattern: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("`{0}` is not a valid response kind")]
    UnknownActionKind(String),

    #[error("the `{0}` response needs at least one argument")]
    MalformedActionArgs(ResponseKind),

    #[error("the `{kind}` response requires the \"{capability}\" capability")]
    InsufficientPermission {
        kind: ResponseKind,
        capability: Capability,
    },

    #[error("not creating trigger: the response was not confirmed")]
    NotConfirmed,

    #[error("a trigger named `{0}` already exists")]
    NameTaken(String),

    #[error("no trigger named `{0}` exists")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Effective permissions a response kind may require from both the invoking
/// user and the bot before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ManageRoles,
    ManageMessages,
    BanMembers,
    KickMembers,
    AddReactions,
    ManageNicknames,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::ManageRoles => "Manage Roles",
            Capability::ManageMessages => "Manage Messages",
            Capability::BanMembers => "Ban Members",
            Capability::KickMembers => "Kick Members",
            Capability::AddReactions => "Add Reactions",
            Capability::ManageNicknames => "Manage Nicknames",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// RESPONSE KINDS AND ACTIONS
// ============================================================================

/// The fixed enumeration of response kinds a trigger may carry.
///
/// `filter` is a legacy alias accepted on input and rewritten to `delete`
/// permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Text,
    Dm,
    #[serde(rename = "dmme")]
    DmMe,
    AddRole,
    RemoveRole,
    Ban,
    Kick,
    Delete,
    Publish,
    React,
    Rename,
    Command,
    Mock,
}

impl ResponseKind {
    /// Every kind except `delete`, `ban` and `kick` needs at least one
    /// argument in a response spec.
    pub fn requires_args(&self) -> bool {
        !matches!(
            self,
            ResponseKind::Delete | ResponseKind::Ban | ResponseKind::Kick
        )
    }

    /// The capability the actor and the bot must both hold before a response
    /// of this kind is accepted.
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            ResponseKind::AddRole | ResponseKind::RemoveRole => Some(Capability::ManageRoles),
            ResponseKind::Delete | ResponseKind::Publish => Some(Capability::ManageMessages),
            ResponseKind::Ban => Some(Capability::BanMembers),
            ResponseKind::Kick => Some(Capability::KickMembers),
            ResponseKind::React => Some(Capability::AddReactions),
            ResponseKind::Rename => Some(Capability::ManageNicknames),
            ResponseKind::Text
            | ResponseKind::Dm
            | ResponseKind::DmMe
            | ResponseKind::Command
            | ResponseKind::Mock => None,
        }
    }
}

impl std::str::FromStr for ResponseKind {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ResponseKind::Text),
            "dm" => Ok(ResponseKind::Dm),
            "dmme" => Ok(ResponseKind::DmMe),
            "add_role" => Ok(ResponseKind::AddRole),
            "remove_role" => Ok(ResponseKind::RemoveRole),
            "ban" => Ok(ResponseKind::Ban),
            "kick" => Ok(ResponseKind::Kick),
            // `filter` is the legacy spelling of `delete`
            "delete" | "filter" => Ok(ResponseKind::Delete),
            "publish" => Ok(ResponseKind::Publish),
            "react" => Ok(ResponseKind::React),
            "rename" => Ok(ResponseKind::Rename),
            "command" => Ok(ResponseKind::Command),
            "mock" => Ok(ResponseKind::Mock),
            other => Err(TriggerError::UnknownActionKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResponseKind::Text => "text",
            ResponseKind::Dm => "dm",
            ResponseKind::DmMe => "dmme",
            ResponseKind::AddRole => "add_role",
            ResponseKind::RemoveRole => "remove_role",
            ResponseKind::Ban => "ban",
            ResponseKind::Kick => "kick",
            ResponseKind::Delete => "delete",
            ResponseKind::Publish => "publish",
            ResponseKind::React => "react",
            ResponseKind::Rename => "rename",
            ResponseKind::Command => "command",
            ResponseKind::Mock => "mock",
        };
        write!(f, "{name}")
    }
}

/// One executable response with its resolved arguments.
///
/// The ordered list of these on a trigger (`multi_payload`) is the form the
/// dispatch engine consults; `response_type` records only the kinds for
/// quick filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseAction {
    Text { content: String },
    Dm { content: String },
    #[serde(rename = "dmme")]
    DmMe { content: String },
    AddRole { roles: Vec<u64> },
    RemoveRole { roles: Vec<u64> },
    Ban,
    Kick,
    Delete,
    Publish,
    React { emojis: Vec<String> },
    Rename { name: String },
    Command { command: String },
    Mock { command: String },
}

impl ResponseAction {
    pub fn kind(&self) -> ResponseKind {
        match self {
            ResponseAction::Text { .. } => ResponseKind::Text,
            ResponseAction::Dm { .. } => ResponseKind::Dm,
            ResponseAction::DmMe { .. } => ResponseKind::DmMe,
            ResponseAction::AddRole { .. } => ResponseKind::AddRole,
            ResponseAction::RemoveRole { .. } => ResponseKind::RemoveRole,
            ResponseAction::Ban => ResponseKind::Ban,
            ResponseAction::Kick => ResponseKind::Kick,
            ResponseAction::Delete => ResponseKind::Delete,
            ResponseAction::Publish => ResponseKind::Publish,
            ResponseAction::React { .. } => ResponseKind::React,
            ResponseAction::Rename { .. } => ResponseKind::Rename,
            ResponseAction::Command { .. } => ResponseKind::Command,
            ResponseAction::Mock { .. } => ResponseKind::Mock,
        }
    }
}

// ============================================================================
// PAYLOADS, COOLDOWNS, MENTION POLICY
// ============================================================================

/// A response payload: either a single value or an ordered list.
///
/// When a list, the engine picks one entry uniformly at random per firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Single(String),
    Many(Vec<String>),
}

impl Payload {
    /// Pick an entry for this firing.
    pub fn pick(&self) -> &str {
        match self {
            Payload::Single(value) => value,
            Payload::Many(values) => values
                .choose(&mut rand::thread_rng())
                .map(String::as_str)
                .unwrap_or(""),
        }
    }

    /// The first entry, used where a deterministic value is needed.
    pub fn first(&self) -> &str {
        match self {
            Payload::Single(value) => value,
            Payload::Many(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        match self {
            Payload::Single(value) => vec![value.clone()],
            Payload::Many(values) => values.clone(),
        }
    }
}

/// The key a cooldown window is tracked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownScope {
    /// One shared window for the whole guild.
    Guild,
    /// One window per channel.
    Channel,
    /// One window per message author.
    Member,
}

impl std::fmt::Display for CooldownScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CooldownScope::Guild => write!(f, "guild"),
            CooldownScope::Channel => write!(f, "channel"),
            CooldownScope::Member => write!(f, "member"),
        }
    }
}

/// Per-trigger rate limit: at most `max_fires` firings within a sliding
/// `seconds` window, tracked per `scope` key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    pub seconds: u64,
    #[serde(default = "default_max_fires")]
    pub max_fires: u32,
    pub scope: CooldownScope,
}

fn default_max_fires() -> u32 {
    1
}

/// Which mention classes a trigger's sent responses may ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MentionPolicy {
    pub users: bool,
    pub roles: bool,
    pub everyone: bool,
    pub replied_user: bool,
}

/// How a text response should be delivered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendOptions {
    pub tts: bool,
    pub reply: bool,
    pub delete_after: Option<u64>,
    pub mentions: MentionPolicy,
}

// ============================================================================
// TRIGGER ENTITY
// ============================================================================

/// The central entity: a compiled pattern bound to an ordered list of
/// response actions and their configuration, scoped to one guild.
#[derive(Debug, Clone)]
pub struct Trigger {
    /// Unique within the owning guild; immutable after creation.
    pub name: String,
    pub pattern: TriggerPattern,
    pub response_type: Vec<ResponseKind>,
    /// Id of the creating user, re-checked for role escalation at parse time
    /// and used as the acting user for `mock` responses.
    pub author: u64,
    pub enabled: bool,
    /// Monotonic match counter, only ever incremented by the dispatch engine
    /// (administrative reset aside).
    pub count: u64,
    pub image: Option<Payload>,
    pub text: Option<Payload>,
    /// Channel/user/role ids; when non-empty, at least one must match the
    /// event context for the trigger to fire.
    pub whitelist: Vec<u64>,
    /// Channel/user/role ids; any match blocks the trigger.
    pub blacklist: Vec<u64>,
    pub cooldown: Option<Cooldown>,
    /// The executable form consulted by the dispatch engine.
    pub multi_payload: Vec<ResponseAction>,
    pub created_at: DateTime<Utc>,
    pub ignore_commands: bool,
    pub check_edits: bool,
    pub ocr_search: bool,
    pub delete_after: Option<u64>,
    pub read_filenames: bool,
    /// Percent chance (0-100) that a matching event actually fires.
    /// Absent means no chance gate.
    pub chance: Option<u8>,
    pub reply: Option<bool>,
    pub tts: bool,
    pub user_mention: bool,
    pub role_mention: bool,
    pub everyone_mention: bool,
    pub nsfw: bool,
}

impl Trigger {
    /// Create a trigger with default configuration. The pattern is compiled
    /// eagerly; an invalid pattern fails creation outright.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        response_type: Vec<ResponseKind>,
        author: u64,
    ) -> Result<Self, TriggerError> {
        Ok(Self {
            name: name.into(),
            pattern: TriggerPattern::compile(pattern)?,
            response_type,
            author,
            enabled: true,
            count: 0,
            image: None,
            text: None,
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            cooldown: None,
            multi_payload: Vec::new(),
            created_at: Utc::now(),
            ignore_commands: false,
            check_edits: false,
            ocr_search: false,
            delete_after: None,
            read_filenames: false,
            chance: None,
            reply: None,
            tts: false,
            user_mention: true,
            role_mention: false,
            everyone_mention: false,
            nsfw: false,
        })
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn mention_policy(&self) -> MentionPolicy {
        MentionPolicy {
            users: self.user_mention,
            roles: self.role_mention,
            everyone: self.everyone_mention,
            replied_user: self.reply.unwrap_or(false),
        }
    }

    pub fn send_options(&self) -> SendOptions {
        SendOptions {
            tts: self.tts,
            reply: self.reply.unwrap_or(false),
            delete_after: self.delete_after,
            mentions: self.mention_policy(),
        }
    }

    /// Rebuild the entity from its persisted document, normalizing legacy
    /// field shapes along the way.
    pub fn from_document(doc: TriggerDocument) -> Result<Self, TriggerError> {
        let response_type = doc.response_type.into_vec();

        // Old documents stored "read filenames" as a boolean in the text
        // slot of delete triggers.
        let mut read_filenames = doc.read_filenames;
        let text = match doc.text {
            Some(TextField::Legacy(flag)) => {
                if response_type.contains(&ResponseKind::Delete) {
                    read_filenames = flag;
                } else {
                    tracing::warn!(name = %doc.name, "dropping boolean text value on a non-delete trigger");
                }
                None
            }
            Some(TextField::Literal(payload)) => Some(payload),
            None => None,
        };

        // Moderation-style triggers used to carry an inverted `ignore_edits`
        // flag instead of `check_edits`.
        let check_edits = doc.check_edits.unwrap_or_else(|| {
            let moderates = response_type.iter().any(|kind| {
                matches!(
                    kind,
                    ResponseKind::Ban | ResponseKind::Kick | ResponseKind::Delete
                )
            });
            moderates && !doc.ignore_edits
        });

        let multi_payload = if doc.multi_payload.is_empty() {
            synthesized_actions(&response_type, text.as_ref())
        } else {
            doc.multi_payload
        };

        Ok(Self {
            name: doc.name,
            pattern: TriggerPattern::compile(&doc.regex)?,
            response_type,
            author: doc.author,
            enabled: doc.enabled,
            count: doc.count,
            image: doc.image,
            text,
            whitelist: doc.whitelist,
            blacklist: doc.blacklist,
            cooldown: doc.cooldown,
            multi_payload,
            created_at: doc.created_at.unwrap_or(DateTime::UNIX_EPOCH),
            ignore_commands: doc.ignore_commands,
            check_edits,
            ocr_search: doc.ocr_search,
            delete_after: doc.delete_after,
            read_filenames,
            chance: doc.chance.map(|c| c.min(100)),
            reply: doc.reply,
            tts: doc.tts,
            user_mention: doc.user_mention,
            role_mention: doc.role_mention,
            everyone_mention: doc.everyone_mention,
            nsfw: doc.nsfw,
        })
    }

    pub fn to_document(&self) -> TriggerDocument {
        TriggerDocument {
            name: self.name.clone(),
            regex: self.pattern.as_str().to_string(),
            response_type: ResponseTypeField::Many(self.response_type.clone()),
            author: self.author,
            enabled: self.enabled,
            count: self.count,
            image: self.image.clone(),
            text: self.text.clone().map(TextField::Literal),
            whitelist: self.whitelist.clone(),
            blacklist: self.blacklist.clone(),
            cooldown: self.cooldown,
            multi_payload: self.multi_payload.clone(),
            created_at: Some(self.created_at),
            ignore_commands: self.ignore_commands,
            check_edits: Some(self.check_edits),
            ignore_edits: false,
            ocr_search: self.ocr_search,
            delete_after: self.delete_after,
            read_filenames: self.read_filenames,
            chance: self.chance,
            reply: self.reply,
            tts: self.tts,
            user_mention: self.user_mention,
            role_mention: self.role_mention,
            everyone_mention: self.everyone_mention,
            nsfw: self.nsfw,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds = self
            .response_type
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "__Name__: **{}**\n__Active__: **{}**\n__Author__: <@{}>\n__Count__: **{}**\n__Response__: **[{}]**\n__Pattern__: `{}`",
            self.name,
            self.enabled,
            self.author,
            self.count,
            kinds,
            self.pattern.as_str(),
        )
    }
}

/// Documents written before the executable action list existed carry only
/// `response_type` plus payloads; rebuild the action list from those.
fn synthesized_actions(kinds: &[ResponseKind], text: Option<&Payload>) -> Vec<ResponseAction> {
    let first = text.map(|p| p.first().to_string()).unwrap_or_default();
    kinds
        .iter()
        .map(|kind| match kind {
            ResponseKind::Text => ResponseAction::Text {
                content: first.clone(),
            },
            ResponseKind::Dm => ResponseAction::Dm {
                content: first.clone(),
            },
            ResponseKind::DmMe => ResponseAction::DmMe {
                content: first.clone(),
            },
            ResponseKind::AddRole => ResponseAction::AddRole {
                roles: payload_ids(text),
            },
            ResponseKind::RemoveRole => ResponseAction::RemoveRole {
                roles: payload_ids(text),
            },
            ResponseKind::Ban => ResponseAction::Ban,
            ResponseKind::Kick => ResponseAction::Kick,
            ResponseKind::Delete => ResponseAction::Delete,
            ResponseKind::Publish => ResponseAction::Publish,
            ResponseKind::React => ResponseAction::React {
                emojis: text.map(Payload::entries).unwrap_or_default(),
            },
            ResponseKind::Rename => ResponseAction::Rename {
                name: first.clone(),
            },
            ResponseKind::Command => ResponseAction::Command {
                command: first.clone(),
            },
            ResponseKind::Mock => ResponseAction::Mock {
                command: first.clone(),
            },
        })
        .collect()
}

fn payload_ids(payload: Option<&Payload>) -> Vec<u64> {
    payload
        .map(Payload::entries)
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| entry.parse::<u64>().ok())
        .collect()
}

// ============================================================================
// PERSISTED DOCUMENT
// ============================================================================

/// `response_type` used to be persisted as a bare string; accept both shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseTypeField {
    One(ResponseKind),
    Many(Vec<ResponseKind>),
}

impl ResponseTypeField {
    pub fn into_vec(self) -> Vec<ResponseKind> {
        match self {
            ResponseTypeField::One(kind) => vec![kind],
            ResponseTypeField::Many(kinds) => kinds,
        }
    }
}

impl Default for ResponseTypeField {
    fn default() -> Self {
        ResponseTypeField::Many(Vec::new())
    }
}

/// `text` used to double as a "read filenames" boolean on delete triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextField {
    Legacy(bool),
    Literal(Payload),
}

/// The plain-data form a trigger is persisted as.
///
/// Every optional field has a default so documents written by older
/// versions deserialize without failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDocument {
    pub name: String,
    pub regex: String,
    #[serde(default)]
    pub response_type: ResponseTypeField,
    pub author: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub image: Option<Payload>,
    #[serde(default)]
    pub text: Option<TextField>,
    #[serde(default)]
    pub whitelist: Vec<u64>,
    #[serde(default)]
    pub blacklist: Vec<u64>,
    #[serde(default)]
    pub cooldown: Option<Cooldown>,
    #[serde(default)]
    pub multi_payload: Vec<ResponseAction>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ignore_commands: bool,
    #[serde(default)]
    pub check_edits: Option<bool>,
    #[serde(default)]
    pub ignore_edits: bool,
    #[serde(default)]
    pub ocr_search: bool,
    #[serde(default)]
    pub delete_after: Option<u64>,
    #[serde(default)]
    pub read_filenames: bool,
    #[serde(default)]
    pub chance: Option<u8>,
    #[serde(default)]
    pub reply: Option<bool>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default = "default_true")]
    pub user_mention: bool,
    #[serde(default)]
    pub role_mention: bool,
    #[serde(default)]
    pub everyone_mention: bool,
    #[serde(default)]
    pub nsfw: bool,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trigger() -> Trigger {
        let mut trigger = Trigger::new(
            "no-spam",
            r"\bspam\b",
            vec![ResponseKind::Delete, ResponseKind::Text],
            42,
        )
        .unwrap();
        trigger.text = Some(Payload::Many(vec!["stop".into(), "please stop".into()]));
        trigger.multi_payload = vec![
            ResponseAction::Delete,
            ResponseAction::Text {
                content: "stop".into(),
            },
        ];
        trigger.blacklist = vec![111];
        trigger.cooldown = Some(Cooldown {
            seconds: 60,
            max_fires: 2,
            scope: CooldownScope::Member,
        });
        trigger.chance = Some(50);
        trigger
    }

    #[test]
    fn document_round_trip_preserves_fields() {
        let trigger = sample_trigger();
        let json = serde_json::to_string(&trigger.to_document()).unwrap();
        let doc: TriggerDocument = serde_json::from_str(&json).unwrap();
        let back = Trigger::from_document(doc).unwrap();

        assert_eq!(back.name, trigger.name);
        assert_eq!(back.pattern.as_str(), trigger.pattern.as_str());
        assert_eq!(back.response_type, trigger.response_type);
        assert_eq!(back.multi_payload, trigger.multi_payload);
        assert_eq!(back.text, trigger.text);
        assert_eq!(back.blacklist, trigger.blacklist);
        assert_eq!(back.cooldown, trigger.cooldown);
        assert_eq!(back.chance, trigger.chance);
        assert_eq!(back.count, trigger.count);
        assert_eq!(back.created_at, trigger.created_at);
    }

    #[test]
    fn invalid_pattern_never_produces_a_trigger() {
        let result = Trigger::new("broken", "(unclosed", vec![ResponseKind::Text], 1);
        assert!(matches!(
            result,
            Err(TriggerError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn legacy_bare_string_response_type_normalizes_to_list() {
        let doc: TriggerDocument = serde_json::from_str(
            r#"{"name": "old", "regex": "hi", "response_type": "text", "author": 1, "text": "hello"}"#,
        )
        .unwrap();
        let trigger = Trigger::from_document(doc).unwrap();
        assert_eq!(trigger.response_type, vec![ResponseKind::Text]);
        assert_eq!(trigger.text, Some(Payload::Single("hello".into())));
    }

    #[test]
    fn legacy_boolean_text_becomes_read_filenames() {
        let doc: TriggerDocument = serde_json::from_str(
            r#"{"name": "old-filter", "regex": "bad", "response_type": ["delete"], "author": 1, "text": true}"#,
        )
        .unwrap();
        let trigger = Trigger::from_document(doc).unwrap();
        assert!(trigger.read_filenames);
        assert_eq!(trigger.text, None);
    }

    #[test]
    fn missing_check_edits_defaults_from_ignore_edits_for_moderation_kinds() {
        let doc: TriggerDocument = serde_json::from_str(
            r#"{"name": "old-delete", "regex": "bad", "response_type": ["delete"], "author": 1}"#,
        )
        .unwrap();
        assert!(Trigger::from_document(doc).unwrap().check_edits);

        let doc: TriggerDocument = serde_json::from_str(
            r#"{"name": "old-delete", "regex": "bad", "response_type": ["delete"], "author": 1, "ignore_edits": true}"#,
        )
        .unwrap();
        assert!(!Trigger::from_document(doc).unwrap().check_edits);

        let doc: TriggerDocument = serde_json::from_str(
            r#"{"name": "old-text", "regex": "hi", "response_type": ["text"], "author": 1, "text": "yo"}"#,
        )
        .unwrap();
        assert!(!Trigger::from_document(doc).unwrap().check_edits);
    }

    #[test]
    fn chance_is_clamped_on_load() {
        let doc: TriggerDocument = serde_json::from_str(
            r#"{"name": "lucky", "regex": "roll", "response_type": ["text"], "author": 1, "text": "win", "chance": 250}"#,
        )
        .unwrap();
        assert_eq!(Trigger::from_document(doc).unwrap().chance, Some(100));
    }

    #[test]
    fn toggle_twice_is_a_no_op() {
        let mut trigger = sample_trigger();
        let initial = trigger.enabled;
        trigger.toggle();
        trigger.toggle();
        assert_eq!(trigger.enabled, initial);

        trigger.disable();
        trigger.disable();
        assert!(!trigger.enabled);
        trigger.enable();
        trigger.enable();
        assert!(trigger.enabled);
    }

    #[test]
    fn actions_synthesized_from_react_payload() {
        let doc: TriggerDocument = serde_json::from_str(
            r#"{"name": "old-react", "regex": "hi", "response_type": ["react"], "author": 1, "text": ["👍", "👎"]}"#,
        )
        .unwrap();
        let trigger = Trigger::from_document(doc).unwrap();
        assert_eq!(
            trigger.multi_payload,
            vec![ResponseAction::React {
                emojis: vec!["👍".into(), "👎".into()]
            }]
        );
    }

    #[test]
    fn mention_policy_follows_flags() {
        let mut trigger = sample_trigger();
        trigger.user_mention = false;
        trigger.role_mention = true;
        trigger.reply = Some(true);
        let policy = trigger.mention_policy();
        assert!(!policy.users);
        assert!(policy.roles);
        assert!(!policy.everyone);
        assert!(policy.replied_user);
    }
}
