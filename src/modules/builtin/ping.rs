//! Ping responder - answers server PING with PONG

use crate::application::errors::HookError;
use crate::modules::context::BotCtx;
use crate::modules::trait_def::{Module, ModuleHook};
use std::sync::Arc;
use tracing::info;

pub struct PingResponder {
    name: String,
    hooks: Vec<ModuleHook>,
}

pub fn construct(ctx: Arc<BotCtx>, name: &str) -> Result<Box<dyn Module>, HookError> {
    let hooks = vec![ModuleHook::on_command("PING", move |event, _payload| {
        // got a ping? send it right back
        let token = event.trailing.as_deref().unwrap_or_default();
        ctx.pong(token)?;
        info!("Responded to a ping: {}", token);
        Ok(())
    })];

    Ok(Box::new(PingResponder {
        name: name.to_string(),
        hooks,
    }))
}

impl Module for PingResponder {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> &[ModuleHook] {
        &self.hooks
    }
}
