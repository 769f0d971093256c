// Bot configuration as read from the data directory.
//
// Only the shapes live here; reading the files is the infra layer's job.

use crate::core::chain::{Command, Event};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No bot token configured (set `token` in Settings.json or DISCORD_TOKEN)")]
    MissingToken,
}

/// What to do when two action mods register under the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Last registration wins.
    #[default]
    Overwrite,
    /// Keep the first registration and report the second as an error.
    Reject,
}

/// How often unavailable guilds are re-checked before "Bot Initialization".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildPollSettings {
    pub interval_ms: u64,
    /// `None` polls until every guild is available.
    pub max_attempts: Option<u32>,
}

impl Default for GuildPollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            max_attempts: None,
        }
    }
}

impl GuildPollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub prefix: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub duplicate_mods: DuplicatePolicy,
    #[serde(default)]
    pub guild_poll: GuildPollSettings,
    /// Upper bound on steps a single chain may execute.
    #[serde(default = "default_max_chain_steps")]
    pub max_chain_steps: usize,
}

fn default_max_chain_steps() -> usize {
    10_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            token: String::new(),
            duplicate_mods: DuplicatePolicy::default(),
            guild_poll: GuildPollSettings::default(),
            max_chain_steps: default_max_chain_steps(),
        }
    }
}

/// `commands.json` wraps its list under a `command` key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandsFile {
    #[serde(default)]
    pub command: Vec<Command>,
}

/// `events.json` wraps its list under an `event` key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsFile {
    #[serde(default)]
    pub event: Vec<Event>,
}

/// Everything loaded from disk at startup.
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    pub settings: Settings,
    /// Anti-spam rules, handed through untouched.
    pub rules: serde_json::Value,
    pub commands: Vec<Command>,
    pub events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_defaults() {
        let settings: Settings = serde_json::from_value(json!({ "prefix": "?" })).unwrap();
        assert_eq!(settings.prefix, "?");
        assert!(settings.token.is_empty());
        assert_eq!(settings.duplicate_mods, DuplicatePolicy::Overwrite);
        assert_eq!(settings.guild_poll.interval_ms, 500);
        assert_eq!(settings.guild_poll.max_attempts, None);
        assert_eq!(settings.max_chain_steps, 10_000);
    }

    #[test]
    fn test_settings_overrides() {
        let settings: Settings = serde_json::from_value(json!({
            "prefix": "!",
            "token": "abc",
            "duplicate_mods": "reject",
            "guild_poll": { "max_attempts": 20 }
        }))
        .unwrap();
        assert_eq!(settings.duplicate_mods, DuplicatePolicy::Reject);
        assert_eq!(settings.guild_poll.interval_ms, 500);
        assert_eq!(settings.guild_poll.max_attempts, Some(20));
    }
}
