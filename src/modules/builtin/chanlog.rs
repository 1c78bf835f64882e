//! Channel logger - appends channel activity to per-channel log files

use crate::application::errors::HookError;
use crate::modules::context::BotCtx;
use crate::modules::trait_def::{Module, ModuleHook};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

pub struct ChanLog {
    name: String,
    hooks: Vec<ModuleHook>,
}

/// Where and what to log; shared by all of the module's hooks
struct Sink {
    dir: PathBuf,
    /// None logs every channel; a config `{"channels": [...]}` restricts it
    channels: Option<Vec<String>>,
}

impl Sink {
    fn allows(&self, channel: &str) -> bool {
        match &self.channels {
            Some(list) => list.iter().any(|c| c.eq_ignore_ascii_case(channel)),
            None => true,
        }
    }

    fn append(&self, channel: &str, line: &str) -> Result<(), HookError> {
        if !self.allows(channel) {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(format!("{}.log", channel)))?;
        writeln!(file, "[{}] {}", Utc::now().format("%Y-%m-%d %H:%M:%S"), line)?;
        Ok(())
    }
}

pub fn construct(ctx: Arc<BotCtx>, name: &str) -> Result<Box<dyn Module>, HookError> {
    let sink = Arc::new(Sink {
        dir: ctx.data_path(name)?,
        channels: ctx.load_config(name)?.and_then(|config| {
            config.get("channels").and_then(|v| v.as_array()).map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
        }),
    });

    let on_privmsg = {
        let sink = sink.clone();
        ModuleHook::on_command("PRIVMSG", move |event, _payload| {
            let Some(channel) = event.channel() else {
                return Ok(());
            };
            let text = event.trailing.as_deref().unwrap_or_default();
            sink.append(channel, &format!("<{}> {}", event.sender.nick, text))
        })
    };

    let on_join = {
        let sink = sink.clone();
        ModuleHook::on_command("JOIN", move |event, _payload| {
            let Some(channel) = event.channel().or(event.trailing.as_deref()) else {
                return Ok(());
            };
            sink.append(channel, &format!("{} joined", event.sender.nick))
        })
    };

    let on_part = ModuleHook::on_command("PART", move |event, _payload| {
        let Some(channel) = event.channel() else {
            return Ok(());
        };
        sink.append(channel, &format!("{} left", event.sender.nick))
    });

    Ok(Box::new(ChanLog {
        name: name.to_string(),
        hooks: vec![on_privmsg, on_join, on_part],
    }))
}

impl Module for ChanLog {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> &[ModuleHook] {
        &self.hooks
    }
}
