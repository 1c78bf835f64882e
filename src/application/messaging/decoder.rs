//! Event decoder - Normalizes raw (topic, payload) pairs into events

use crate::application::errors::DecodeError;
use crate::domain::entities::{Event, UserPrefix};
use serde_json::{Map, Value};
use tracing::trace;

/// Event category reserved for identity metadata; merged into the meta
/// store, never dispatched
const META_UPDATE: &str = "meta_update";

/// Outcome of decoding one bus message
#[derive(Debug)]
pub enum Inbound {
    /// A fully decoded event, ready for dispatch
    Event(Event),
    /// Partial metadata to merge into the meta store
    MetaUpdate(Map<String, Value>),
    /// Addressed to another bot sharing the bus; discard silently
    Foreign,
}

/// Decodes bus payloads of the form `"<identity-token> <json>"`.
///
/// The topic encodes the event category as `<prefix>_<category>`; the
/// category, uppercased, becomes the event's command verb.
pub struct EventDecoder {
    identity: String,
    topic_prefix: String,
}

impl EventDecoder {
    pub fn new(identity: impl Into<String>, topic_prefix: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            topic_prefix: topic_prefix.into(),
        }
    }

    /// Decode one (topic, payload) pair.
    ///
    /// Payloads addressed to a different identity yield [`Inbound::Foreign`];
    /// that is a normal condition on a shared bus, not an error. Anything
    /// malformed yields a [`DecodeError`] and the message is dropped by the
    /// caller.
    pub fn decode(&self, topic: &str, payload: &str) -> Result<Inbound, DecodeError> {
        let (ident, rest) = payload
            .split_once(' ')
            .ok_or_else(|| DecodeError::MissingIdentity(preview(payload)))?;

        if ident != self.identity {
            trace!("Ignoring message for '{}' on '{}'", ident, topic);
            return Ok(Inbound::Foreign);
        }

        let category = topic
            .strip_prefix(self.topic_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|category| !category.is_empty())
            .ok_or_else(|| DecodeError::UnknownTopic(topic.to_string()))?;

        if category == META_UPDATE {
            let partial: Map<String, Value> = serde_json::from_str(rest)?;
            return Ok(Inbound::MetaUpdate(partial));
        }

        let (args, (nick, user, host), trailing, extras): (
            Vec<String>,
            (String, String, String),
            Option<String>,
            Map<String, Value>,
        ) = serde_json::from_str(rest)?;

        Ok(Inbound::Event(
            Event::new(category)
                .with_args(args)
                .with_sender(UserPrefix::new(nick, user, host))
                .with_trailing(trailing)
                .with_extras(extras),
        ))
    }
}

fn preview(payload: &str) -> String {
    payload.chars().take(64).collect()
}
