//! Hook dispatcher - Walks the module registry for each event

use crate::domain::entities::Event;
use crate::modules::context::BotCtx;
use crate::modules::manager::SharedRegistry;
use crate::modules::trait_def::{panic_message, Validation};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Dispatches events to every matching hook of every loaded module.
///
/// Order is deterministic: module registration order, then hook declaration
/// order within a module. There is no stop-propagation primitive; every
/// matching hook fires. A fault in one hook is logged and isolated, so one
/// misbehaving module never blocks delivery to the others.
pub struct HookDispatcher {
    registry: SharedRegistry,
    ctx: Arc<BotCtx>,
}

impl HookDispatcher {
    pub fn new(registry: SharedRegistry, ctx: Arc<BotCtx>) -> Self {
        Self { registry, ctx }
    }

    /// Run every matching hook for one event, in registry order.
    ///
    /// Works on a snapshot of the registry, so a concurrent lifecycle
    /// operation is observed either fully or not at all, never half-applied.
    pub fn dispatch(&self, event: &Event) {
        let snapshot = match self.registry.read() {
            Ok(registry) => registry.snapshot(),
            Err(_) => {
                error!("Registry lock poisoned, dropping event {}", event.command);
                return;
            }
        };

        for (name, module) in &snapshot {
            for (index, hook) in module.hooks().iter().enumerate() {
                let validation =
                    match catch_unwind(AssertUnwindSafe(|| (hook.validator)(event, &self.ctx))) {
                        Ok(validation) => validation,
                        Err(panic) => {
                            error!(
                                "Validator {}#{} panicked: {}",
                                name,
                                index,
                                panic_message(&panic)
                            );
                            continue;
                        }
                    };

                let payload = match validation {
                    Validation::NoMatch => continue,
                    Validation::Matched(payload) => payload,
                };

                match catch_unwind(AssertUnwindSafe(|| (hook.handler)(event, &payload))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!("Hook {}#{} failed on {}: {}", name, index, event.command, e);
                    }
                    Err(panic) => {
                        error!(
                            "Hook {}#{} panicked on {}: {}",
                            name,
                            index,
                            event.command,
                            panic_message(&panic)
                        );
                    }
                }
            }
        }
    }
}
