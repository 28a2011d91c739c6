// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "triggers/executor.rs"]
pub mod executor;
#[path = "triggers/resolver.rs"]
pub mod resolver;
#[path = "triggers/trigger_handler.rs"]
pub mod trigger_handler;

// Re-export command types for convenience
pub use commands::triggers::{Data, Error};

/// Prefix used for text-command invocations, including mocked commands.
pub const COMMAND_PREFIX: &str = "!";
