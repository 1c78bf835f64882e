//! Configuration management

use crate::application::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub bus: BusConfig,
    /// Modules to load at startup, in dispatch order
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    /// Identity token on the bus; events addressed to other names are ignored
    pub name: String,
    /// Root for module config files and data directories
    pub datadir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    /// Bus topics are `<prefix>_<category>`
    pub topic_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "default".to_string(),
                datadir: PathBuf::from("data"),
            },
            bus: BusConfig {
                host: "localhost".to_string(),
                port: 7100,
                topic_prefix: "ircbus".to_string(),
            },
            modules: vec!["ping".to_string()],
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.into())?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
