// Trigger matching and response execution.
//
// The submodules map onto the moving parts of the system: compiled
// patterns, the response spec parser, the trigger entity and its store,
// and the dispatch engine that ties them together per message event.

pub mod dispatch;
pub mod pattern;
pub mod response_parser;
pub mod trigger_models;
pub mod trigger_service;

pub use dispatch::{
    ActionError, ActionExecutor, DispatchConfig, DispatchEngine, DispatchSummary,
    ImageTextReader, MessageEvent, SkipReason,
};
pub use pattern::{PatternTimeout, TriggerPattern};
pub use response_parser::{
    parse_response_spec, Confirmation, ParsedResponse, ParserContext, RoleRef,
    CONFIRM_TIMEOUT_SECS,
};
pub use trigger_models::{
    Capability, Cooldown, CooldownScope, MentionPolicy, Payload, ResponseAction, ResponseKind,
    SendOptions, Trigger, TriggerDocument, TriggerError,
};
pub use trigger_service::{TriggerService, TriggerStore};
