//! ircbus-bot - runs chat bot modules behind a pubsub message bus
//!
//! An upstream bot-core process owns the IRC connection and republishes
//! protocol events on per-category bus topics. This crate subscribes to those
//! topics, normalizes each payload into an [`domain::entities::Event`],
//! dispatches it through the hook registry of every loaded module, and
//! republishes outbound commands tagged with this process's identity.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod modules;
