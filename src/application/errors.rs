//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Transport payload decode errors. A decode failure drops the offending
/// message; it is never fatal to the dispatch loop.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Payload carries no identity token: {0:?}")]
    MissingIdentity(String),

    #[error("Unrecognized topic: {0}")]
    UnknownTopic(String),

    #[error("Malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Module lifecycle errors, surfaced to the caller of load/reload/unload
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Module '{0}' already loaded")]
    AlreadyLoaded(String),

    #[error("Module '{0}' failed to construct: {1}")]
    Construction(String, String),

    #[error("Module '{0}' teardown failed: {1}")]
    Teardown(String, String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error raised by module code: hook handlers, constructors, and teardown.
/// Always isolated at the single hook or lifecycle call that raised it.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

/// Message bus transport errors
#[derive(Error, Debug)]
pub enum BusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bus connection closed")]
    Closed,

    #[error("Malformed bus frame: {0:?}")]
    Frame(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}
