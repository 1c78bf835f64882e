//! Bot context - The capability surface handed to modules

use crate::application::errors::{BusError, HookError};
use crate::domain::entities::Event;
use crate::domain::traits::BusMessage;
use crate::infrastructure::storage::MetaStore;
use crate::modules::manager::ReloadRequest;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// `"<nick>: rest"` / `"<nick>, rest"` addressing convention
static ADDRESSED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)[:,]\s*(.*)$").expect("addressing regex"));

/// Shared context given to every module at construction and to every
/// validator at dispatch.
///
/// Exposes identity, metadata reads, the outbound action gateway, and the
/// module filesystem boundary. It deliberately exposes no registry access;
/// a module that wants to self-modify enqueues a reload request, which the
/// dispatch loop applies between events.
pub struct BotCtx {
    name: String,
    datadir: PathBuf,
    topic_prefix: String,
    meta: MetaStore,
    outbound: mpsc::UnboundedSender<BusMessage>,
    reloads: mpsc::UnboundedSender<ReloadRequest>,
}

impl BotCtx {
    pub fn new(
        name: impl Into<String>,
        datadir: impl Into<PathBuf>,
        topic_prefix: impl Into<String>,
        outbound: mpsc::UnboundedSender<BusMessage>,
        reloads: mpsc::UnboundedSender<ReloadRequest>,
    ) -> Self {
        Self {
            name: name.into(),
            datadir: datadir.into(),
            topic_prefix: topic_prefix.into(),
            meta: MetaStore::new(),
            outbound,
            reloads,
        }
    }

    /// Configured identity token of this process on the bus
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read access to the process metadata
    pub fn meta(&self) -> &MetaStore {
        &self.meta
    }

    /// Current display nick, when the identity authority has supplied one
    pub fn nick(&self) -> Option<String> {
        self.meta.get_str("nick")
    }

    /// Full bus topic for an event category
    pub fn topic(&self, category: &str) -> String {
        format!("{}_{}", self.topic_prefix, category)
    }

    pub fn topic_prefix(&self) -> &str {
        &self.topic_prefix
    }

    /// Enqueue an outbound command, republished on the bus tagged with this
    /// process's identity token. Args are JSON-encoded; their contents are
    /// not interpreted here.
    pub fn act<A: Serialize>(&self, verb: &str, args: &A) -> Result<(), BusError> {
        let body = format!("{} {} {}", self.name, verb, serde_json::to_string(args)?);
        self.outbound
            .send(BusMessage::new(self.topic("send"), body))
            .map_err(|_| BusError::Closed)
    }

    /// Send a message to a channel or user
    pub fn privmsg(&self, target: &str, text: &str) -> Result<(), BusError> {
        self.act("privmsg", &(target, text))
    }

    /// Answer a server ping
    pub fn pong(&self, token: &str) -> Result<(), BusError> {
        self.act("pong", &[token])
    }

    /// When the event's trailing text addresses this bot by its current nick
    /// (`"mynick: rest"` or `"mynick, rest"`), return the rest.
    pub fn addressed(&self, event: &Event) -> Option<String> {
        let nick = self.nick()?;
        let trailing = event.trailing.as_deref()?;
        let captures = ADDRESSED_RE.captures(trailing)?;
        if captures[1].eq_ignore_ascii_case(&nick) {
            Some(captures[2].to_string())
        } else {
            None
        }
    }

    /// Ask the lifecycle manager to reload (or first-load) a module. Applied
    /// by the dispatch loop between events; never mutates the registry from
    /// the caller's context.
    pub fn request_reload(&self, name: impl Into<String>) {
        let _ = self.reloads.send(ReloadRequest { name: name.into() });
    }

    /// Path of a module's JSON config file, if one exists
    pub fn config_path(&self, module: &str) -> Option<PathBuf> {
        let path = self.datadir.join("config").join(format!("{}.json", module));
        path.exists().then_some(path)
    }

    /// A module's writable data directory, created on first use
    pub fn data_path(&self, module: &str) -> std::io::Result<PathBuf> {
        let dir = self.datadir.join("data").join(module);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Load and parse a module's JSON config, if one exists
    pub fn load_config(&self, module: &str) -> Result<Option<Value>, HookError> {
        match self.config_path(module) {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }
}
