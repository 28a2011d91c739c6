// Match & dispatch engine - tests every enabled trigger in a guild against
// an inbound message event, runs the filter chain, and executes the
// surviving triggers' response actions in order.
//
// All matching triggers fire independently; there is no stop-at-first-match.
// Dispatch-time failures are absorbed and logged, never raised to the event
// pipeline.

use super::pattern::PatternTimeout;
use super::trigger_models::{ResponseAction, ResponseKind, SendOptions, Trigger};
use super::trigger_service::{TriggerService, TriggerStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// EVENT AND OUTCOME TYPES
// ============================================================================

/// A platform-neutral view of one inbound (or edited) message.
#[derive(Debug, Clone, Default)]
pub struct MessageEvent {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub author_id: u64,
    pub author_roles: Vec<u64>,
    pub content: String,
    pub attachment_names: Vec<String>,
    pub attachment_urls: Vec<String>,
    pub is_command: bool,
    pub is_edit: bool,
    pub channel_nsfw: bool,
}

impl MessageEvent {
    /// Ids the allow/deny lists are matched against: channel, author, and
    /// the author's roles.
    fn scope_ids(&self) -> impl Iterator<Item = u64> + '_ {
        [self.channel_id, self.author_id]
            .into_iter()
            .chain(self.author_roles.iter().copied())
    }
}

/// Why a matching (or would-be matching) trigger did not fire.
///
/// The filter stages are ordered: a candidate failing an earlier stage never
/// reaches the later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    CommandMessage,
    EditNotChecked,
    NotNsfwChannel,
    DenyListed,
    NotAllowListed,
    OnCooldown,
    ChanceMissed,
}

/// What one dispatch pass did, for logging and tests.
#[derive(Debug, Default)]
pub struct DispatchSummary {
    pub fired: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    pub action_failures: usize,
}

/// One response action failed during dispatch. Absorbed and logged; never
/// interrupts the remaining actions or other triggers.
#[derive(Debug, Error)]
#[error("`{kind}` response failed: {message}")]
pub struct ActionError {
    pub kind: ResponseKind,
    pub message: String,
}

impl ActionError {
    pub fn new(kind: ResponseKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ============================================================================
// PORTS
// ============================================================================

/// The side-effect surface response actions execute against. Implemented by
/// the Discord layer per event; mocked in tests.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn send_text(&self, content: &str, options: &SendOptions) -> Result<(), ActionError>;
    async fn delete_message(&self) -> Result<(), ActionError>;
    async fn ban_author(&self, reason: &str) -> Result<(), ActionError>;
    async fn kick_author(&self, reason: &str) -> Result<(), ActionError>;
    async fn add_roles(&self, roles: &[u64]) -> Result<(), ActionError>;
    async fn remove_roles(&self, roles: &[u64]) -> Result<(), ActionError>;
    async fn react(&self, emojis: &[String]) -> Result<(), ActionError>;
    async fn rename_author(&self, nickname: &str) -> Result<(), ActionError>;
    async fn dm_author(&self, content: &str) -> Result<(), ActionError>;
    async fn dm_user(&self, user_id: u64, content: &str) -> Result<(), ActionError>;
    async fn publish_message(&self) -> Result<(), ActionError>;
    /// Run `command` as if `user_id` had sent it.
    async fn run_command(&self, user_id: u64, command: &str) -> Result<(), ActionError>;
}

/// Extracts searchable text from image attachments for `ocr_search`
/// triggers. The default implementation returns nothing.
#[async_trait]
pub trait ImageTextReader: Send + Sync {
    async fn extract_text(&self, attachment_urls: &[String]) -> Option<String>;
}

// ============================================================================
// COOLDOWN TRACKER
// ============================================================================

/// Sliding-window fire tracker keyed by (guild, trigger, scope key).
#[derive(Default)]
pub struct CooldownTracker {
    fires: DashMap<(u64, String, u64), Vec<DateTime<Utc>>>,
}

impl CooldownTracker {
    fn key(trigger: &Trigger, event: &MessageEvent) -> (u64, String, u64) {
        use super::trigger_models::CooldownScope;
        let scope_key = match trigger.cooldown.map(|c| c.scope) {
            Some(CooldownScope::Channel) => event.channel_id,
            Some(CooldownScope::Member) => event.author_id,
            Some(CooldownScope::Guild) | None => 0,
        };
        (event.guild_id, trigger.name.clone(), scope_key)
    }

    /// Whether the trigger's window still has room for another fire.
    pub fn allows(&self, trigger: &Trigger, event: &MessageEvent) -> bool {
        let Some(cooldown) = trigger.cooldown else {
            return true;
        };
        let cutoff = Utc::now() - chrono::Duration::seconds(cooldown.seconds as i64);
        match self.fires.get(&Self::key(trigger, event)) {
            Some(times) => {
                times.iter().filter(|t| **t >= cutoff).count() < cooldown.max_fires as usize
            }
            None => true,
        }
    }

    /// Record a fire and prune entries that fell out of the window.
    pub fn record(&self, trigger: &Trigger, event: &MessageEvent) {
        let Some(cooldown) = trigger.cooldown else {
            return;
        };
        let cutoff = Utc::now() - chrono::Duration::seconds(cooldown.seconds as i64);
        let mut entry = self
            .fires
            .entry(Self::key(trigger, event))
            .or_default();
        entry.retain(|t| *t >= cutoff);
        entry.push(Utc::now());
    }

    #[allow(dead_code)]
    pub fn tracked_keys(&self) -> usize {
        self.fires.len()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Wall-clock budget per pattern evaluation per trigger per event.
    pub match_budget: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            match_budget: Duration::from_millis(100),
        }
    }
}

pub struct DispatchEngine<S: TriggerStore> {
    triggers: Arc<TriggerService<S>>,
    reader: Arc<dyn ImageTextReader>,
    cooldowns: CooldownTracker,
    config: DispatchConfig,
}

impl<S: TriggerStore> DispatchEngine<S> {
    pub fn new(
        triggers: Arc<TriggerService<S>>,
        reader: Arc<dyn ImageTextReader>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            triggers,
            reader,
            cooldowns: CooldownTracker::default(),
            config,
        }
    }

    /// Run one inbound event through every trigger in its guild.
    pub async fn dispatch<E: ActionExecutor>(
        &self,
        event: &MessageEvent,
        executor: &E,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let triggers = match self.triggers.triggers_for(event.guild_id).await {
            Ok(triggers) => triggers,
            Err(e) => {
                tracing::error!(guild_id = event.guild_id, "failed to load triggers: {e}");
                return summary;
            }
        };

        // Attachment text is extracted at most once per event, and only if
        // some trigger actually asks for it.
        let mut extracted_text: Option<Option<String>> = None;

        for trigger in triggers.iter() {
            if let Some(reason) = gate(trigger, event) {
                summary.skipped.push((trigger.name.clone(), reason));
                continue;
            }
            if !self.matches(trigger, event, &mut extracted_text).await {
                continue;
            }
            if let Some(reason) = self.filter(trigger, event) {
                summary.skipped.push((trigger.name.clone(), reason));
                continue;
            }

            let (succeeded, failed) = self.execute(trigger, event, executor).await;
            summary.action_failures += failed;
            if succeeded > 0 {
                if let Err(e) = self
                    .triggers
                    .record_fire(event.guild_id, &trigger.name)
                    .await
                {
                    tracing::error!(name = %trigger.name, "failed to persist fire count: {e}");
                }
                self.cooldowns.record(trigger, event);
                summary.fired.push(trigger.name.clone());
            }
        }

        summary
    }

    /// Candidate test: the pattern against the content, plus attachment
    /// filenames and extracted image text when the trigger opts in.
    async fn matches(
        &self,
        trigger: &Trigger,
        event: &MessageEvent,
        extracted_text: &mut Option<Option<String>>,
    ) -> bool {
        let budget = self.config.match_budget;
        match trigger.pattern.is_match_within(&event.content, budget).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(timeout) => {
                self.warn_timeout(trigger, timeout);
                return false;
            }
        }

        if trigger.read_filenames && !event.attachment_names.is_empty() {
            let haystack = event.attachment_names.join(" ");
            match trigger.pattern.is_match_within(&haystack, budget).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(timeout) => {
                    self.warn_timeout(trigger, timeout);
                    return false;
                }
            }
        }

        if trigger.ocr_search && !event.attachment_urls.is_empty() {
            if extracted_text.is_none() {
                *extracted_text =
                    Some(self.reader.extract_text(&event.attachment_urls).await);
            }
            if let Some(Some(text)) = extracted_text {
                match trigger.pattern.is_match_within(text, budget).await {
                    Ok(matched) => return matched,
                    Err(timeout) => {
                        self.warn_timeout(trigger, timeout);
                        return false;
                    }
                }
            }
        }

        false
    }

    fn warn_timeout(&self, trigger: &Trigger, timeout: PatternTimeout) {
        tracing::warn!(name = %trigger.name, "{timeout}; treating as no match");
    }

    /// The ordered filter chain. The first failing stage excludes the
    /// candidate without evaluating the later stages.
    fn filter(&self, trigger: &Trigger, event: &MessageEvent) -> Option<SkipReason> {
        if trigger
            .blacklist
            .iter()
            .any(|id| event.scope_ids().any(|scope| scope == *id))
        {
            return Some(SkipReason::DenyListed);
        }
        if !trigger.whitelist.is_empty()
            && !trigger
                .whitelist
                .iter()
                .any(|id| event.scope_ids().any(|scope| scope == *id))
        {
            return Some(SkipReason::NotAllowListed);
        }
        if !self.cooldowns.allows(trigger, event) {
            return Some(SkipReason::OnCooldown);
        }
        if let Some(chance) = trigger.chance {
            let roll = rand::thread_rng().gen_range(1..=100u32);
            if roll > u32::from(chance) {
                return Some(SkipReason::ChanceMissed);
            }
        }
        None
    }

    /// Execute the trigger's actions in definition order, isolating
    /// failures. Returns (succeeded, failed) counts.
    async fn execute<E: ActionExecutor>(
        &self,
        trigger: &Trigger,
        event: &MessageEvent,
        executor: &E,
    ) -> (usize, usize) {
        let mut succeeded = 0;
        let mut failed = 0;
        for action in &trigger.multi_payload {
            match self.run_action(trigger, event, action, executor).await {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(name = %trigger.name, "{e}");
                }
            }
        }
        (succeeded, failed)
    }

    async fn run_action<E: ActionExecutor>(
        &self,
        trigger: &Trigger,
        event: &MessageEvent,
        action: &ResponseAction,
        executor: &E,
    ) -> Result<(), ActionError> {
        let options = trigger.send_options();
        match action {
            ResponseAction::Text { content } => {
                executor
                    .send_text(pick_text(trigger, content), &options)
                    .await
            }
            ResponseAction::Dm { content } => {
                executor.dm_author(pick_text(trigger, content)).await
            }
            ResponseAction::DmMe { content } => {
                executor
                    .dm_user(trigger.author, pick_text(trigger, content))
                    .await
            }
            ResponseAction::AddRole { roles } => executor.add_roles(roles).await,
            ResponseAction::RemoveRole { roles } => executor.remove_roles(roles).await,
            ResponseAction::Ban => {
                executor
                    .ban_author(&format!("Trigger response: {}", trigger.name))
                    .await
            }
            ResponseAction::Kick => {
                executor
                    .kick_author(&format!("Trigger response: {}", trigger.name))
                    .await
            }
            ResponseAction::Delete => executor.delete_message().await,
            ResponseAction::Publish => executor.publish_message().await,
            ResponseAction::React { emojis } => executor.react(emojis).await,
            ResponseAction::Rename { name } => executor.rename_author(name).await,
            ResponseAction::Command { command } => {
                executor.run_command(event.author_id, command).await
            }
            ResponseAction::Mock { command } => {
                executor.run_command(trigger.author, command).await
            }
        }
    }
}

/// Text-like actions draw from the trigger's payload list when one is set,
/// so list-configured triggers vary their responses per firing.
fn pick_text<'a>(trigger: &'a Trigger, fallback: &'a str) -> &'a str {
    match &trigger.text {
        Some(payload) => payload.pick(),
        None => fallback,
    }
}

/// Per-trigger eligibility, before any pattern work.
fn gate(trigger: &Trigger, event: &MessageEvent) -> Option<SkipReason> {
    if !trigger.enabled {
        Some(SkipReason::Disabled)
    } else if event.is_command && trigger.ignore_commands {
        Some(SkipReason::CommandMessage)
    } else if event.is_edit && !trigger.check_edits {
        Some(SkipReason::EditNotChecked)
    } else if trigger.nsfw && !event.channel_nsfw {
        Some(SkipReason::NotNsfwChannel)
    } else {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
