//! Module trait definitions

use crate::application::errors::HookError;
use crate::domain::entities::Event;
use crate::modules::context::BotCtx;
use serde_json::Value;
use std::any::Any;

/// Result of a hook validator.
///
/// `Matched` carries an arbitrary JSON payload that is handed to the handler
/// verbatim, typically a value the validator already extracted from the
/// event (e.g. a parsed command argument).
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    NoMatch,
    Matched(Value),
}

impl Validation {
    /// A match with no extracted payload
    pub fn matched() -> Self {
        Validation::Matched(Value::Null)
    }

    /// Match exactly when `condition` holds
    pub fn when(condition: bool) -> Self {
        if condition {
            Self::matched()
        } else {
            Validation::NoMatch
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Validation::Matched(_))
    }
}

/// Decides whether a hook is interested in an event
pub type Validator = Box<dyn Fn(&Event, &BotCtx) -> Validation + Send + Sync>;

/// Performs a module's reaction to a matched event
pub type Handler = Box<dyn Fn(&Event, &Value) -> Result<(), HookError> + Send + Sync>;

/// One (validator, handler) pair owned by a loaded module.
///
/// Hooks live exactly as long as the module instance that declared them;
/// replacing or unloading the module drops its hooks with it.
pub struct ModuleHook {
    pub validator: Validator,
    pub handler: Handler,
}

impl ModuleHook {
    pub fn new(
        validator: impl Fn(&Event, &BotCtx) -> Validation + Send + Sync + 'static,
        handler: impl Fn(&Event, &Value) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            validator: Box::new(validator),
            handler: Box::new(handler),
        }
    }

    /// Hook matching a single command verb, the most common shape
    pub fn on_command(
        command: impl Into<String>,
        handler: impl Fn(&Event, &Value) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        let command = command.into().to_uppercase();
        Self::new(
            move |event, _ctx| Validation::when(event.command == command),
            handler,
        )
    }
}

/// Core module trait that all modules must implement.
///
/// Instances are built by a factory registered in the module catalog and are
/// owned exclusively by the lifecycle manager; the dispatcher only ever sees
/// them through registry snapshots.
pub trait Module: Send + Sync {
    /// Name this instance was loaded under
    fn name(&self) -> &str;

    /// Hooks in declaration order; dispatch preserves this order
    fn hooks(&self) -> &[ModuleHook];

    /// Optional: release resources when the module is replaced or unloaded.
    /// Best-effort; a failure is logged and never blocks replacement.
    fn teardown(&self) -> Result<(), HookError> {
        Ok(())
    }
}

/// Render a caught panic payload for logging
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
