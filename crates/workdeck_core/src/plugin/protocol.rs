//! Plugin capability contract.

use crate::model::context::{Context, ContextState, Note};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PluginResult = Result<(), PluginError>;

/// Failure raised by a plugin hook or command handler.
///
/// Lifecycle hook errors are contained by the dispatcher; command errors
/// surface to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    Failed(String),
    UnknownPlugin(String),
    UnknownCommand { plugin: String, command: String },
    InvalidArgs(String),
}

impl Display for PluginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(message) => write!(f, "plugin failed: {message}"),
            Self::UnknownPlugin(name) => write!(f, "no plugin registered as `{name}`"),
            Self::UnknownCommand { plugin, command } => {
                write!(f, "plugin `{plugin}` has no command `{command}`")
            }
            Self::InvalidArgs(message) => write!(f, "invalid command arguments: {message}"),
        }
    }
}

impl Error for PluginError {}

/// Descriptor for a plugin-defined command, surfaced to the CLI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub help: String,
}

impl CommandSpec {
    pub fn new(help: impl Into<String>) -> Self {
        Self { help: help.into() }
    }
}

/// A named, versioned capability unit observing context lifecycle events.
///
/// Every hook has an inert default body, so an implementation overrides
/// only what it cares about. Hooks receive the live context and may mutate
/// it in place; that is the one sanctioned extension point for context
/// data, and the manager persists such mutations.
pub trait Plugin {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Commands this plugin exposes, keyed by command name.
    fn commands(&self) -> BTreeMap<String, CommandSpec> {
        BTreeMap::new()
    }

    /// Runs one of the commands advertised by [`Plugin::commands`].
    ///
    /// `context` is the target context when the command operates on one.
    fn run_command(
        &mut self,
        command: &str,
        context: Option<&mut Context>,
        args: &[String],
    ) -> Result<String, PluginError> {
        let _ = (context, args);
        Err(PluginError::UnknownCommand {
            plugin: self.name().to_string(),
            command: command.to_string(),
        })
    }

    fn on_context_created(&mut self, context: &mut Context) -> PluginResult {
        let _ = context;
        Ok(())
    }

    fn on_context_switched(&mut self, context: &mut Context) -> PluginResult {
        let _ = context;
        Ok(())
    }

    /// Fired with the pre-deletion snapshot; the context is already gone.
    fn on_context_deleted(&mut self, context: &Context) -> PluginResult {
        let _ = context;
        Ok(())
    }

    fn on_context_imported(&mut self, context: &mut Context) -> PluginResult {
        let _ = context;
        Ok(())
    }

    fn on_state_changed(&mut self, context: &mut Context, new_state: ContextState) -> PluginResult {
        let _ = (context, new_state);
        Ok(())
    }

    fn on_note_added(&mut self, context: &mut Context, note: &Note) -> PluginResult {
        let _ = (context, note);
        Ok(())
    }

    /// Status line contributed to displays, or `None` for nothing.
    fn status_info(&self, context: &Context) -> Option<String> {
        let _ = context;
        None
    }

    /// Shell-prompt fragment contributed to prompt exporters, or `None`.
    fn prompt_info(&self, context: &Context) -> Option<String> {
        let _ = context;
        None
    }
}
