use serde_json::{Map, Value};
use std::fmt;

/// Structured identity of the user an event originated from,
/// parsed from a `nick!user@host` prefix triple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserPrefix {
    pub nick: String,
    pub user: String,
    pub host: String,
}

impl UserPrefix {
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            user: user.into(),
            host: host.into(),
        }
    }
}

impl fmt::Display for UserPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}@{}", self.nick, self.user, self.host)
    }
}

/// One inbound protocol occurrence, fully decoded.
///
/// An `Event` is either constructed whole by the decoder or not at all;
/// partially decoded payloads never reach dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Uppercase protocol verb (`PRIVMSG`, `JOIN`, ...)
    pub command: String,
    /// Ordered positional parameters
    pub args: Vec<String>,
    /// Who the event came from
    pub sender: UserPrefix,
    /// Free-text payload (last positional argument by protocol convention)
    pub trailing: Option<String>,
    /// Additional transport-supplied fields, passed through opaquely
    pub extras: Map<String, Value>,
}

impl Event {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into().to_uppercase(),
            args: Vec::new(),
            sender: UserPrefix::new("", "", ""),
            trailing: None,
            extras: Map::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_sender(mut self, sender: UserPrefix) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_trailing(mut self, trailing: Option<String>) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn with_extras(mut self, extras: Map<String, Value>) -> Self {
        self.extras = extras;
        self
    }

    /// First positional argument, which carries the channel for most
    /// channel-scoped commands
    pub fn channel(&self) -> Option<&str> {
        self.args.first().map(|s| s.as_str())
    }
}
