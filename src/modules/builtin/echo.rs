//! Echo responder - repeats text addressed to the bot as `echo <text>`

use crate::application::errors::HookError;
use crate::domain::entities::Event;
use crate::modules::context::BotCtx;
use crate::modules::trait_def::{Module, ModuleHook, Validation};
use serde_json::Value;
use std::sync::Arc;

pub struct Echo {
    name: String,
    hooks: Vec<ModuleHook>,
}

pub fn construct(ctx: Arc<BotCtx>, name: &str) -> Result<Box<dyn Module>, HookError> {
    let hooks = vec![ModuleHook::new(
        // matches "mynick: echo <text>"; the extracted text rides along to
        // the handler as the validation payload
        |event, ctx| {
            if event.command != "PRIVMSG" {
                return Validation::NoMatch;
            }
            let text = ctx
                .addressed(event)
                .and_then(|rest| rest.strip_prefix("echo ").map(|s| s.trim().to_string()));
            match text {
                Some(text) if !text.is_empty() => Validation::Matched(Value::String(text)),
                _ => Validation::NoMatch,
            }
        },
        move |event, payload| {
            let text = payload.as_str().unwrap_or_default();
            ctx.privmsg(reply_target(event), text)?;
            Ok(())
        },
    )];

    Ok(Box::new(Echo {
        name: name.to_string(),
        hooks,
    }))
}

/// Channel messages are answered in the channel, queries to the sender
fn reply_target(event: &Event) -> &str {
    match event.channel() {
        Some(channel) if channel.starts_with('#') => channel,
        _ => event.sender.nick.as_str(),
    }
}

impl Module for Echo {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> &[ModuleHook] {
        &self.hooks
    }
}
