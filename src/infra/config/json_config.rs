// Reads the bot's data directory into a `BotConfig`.
//
// Layout under the data root:
//   Settings/Settings.json   prefix, token, tuning knobs
//   Settings/Rules.json      anti-spam rules (optional)
//   commands/commands.json   { "command": [...] }
//   commands/events.json     { "event": [...] }
//   user/user.json           user cache
//   variables/*.json         variable scopes

use crate::core::config::{BotConfig, CommandsFile, ConfigError, EventsFile, Settings};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DataLayout {
    pub root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn settings(&self) -> PathBuf {
        self.root.join("Settings").join("Settings.json")
    }

    pub fn rules(&self) -> PathBuf {
        self.root.join("Settings").join("Rules.json")
    }

    pub fn commands(&self) -> PathBuf {
        self.root.join("commands").join("commands.json")
    }

    pub fn events(&self) -> PathBuf {
        self.root.join("commands").join("events.json")
    }

    pub fn user_file(&self) -> PathBuf {
        self.root.join("user").join("user.json")
    }

    pub fn server_vars(&self) -> PathBuf {
        self.root.join("variables").join("servervars.json")
    }

    pub fn global_vars(&self) -> PathBuf {
        self.root.join("variables").join("globalvars.json")
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Load the configuration, taking the token from `DISCORD_TOKEN` when the
/// settings file leaves it empty.
pub fn load_config(layout: &DataLayout) -> Result<BotConfig, ConfigError> {
    load_config_with_token(layout, std::env::var("DISCORD_TOKEN").ok())
}

pub fn load_config_with_token(
    layout: &DataLayout,
    env_token: Option<String>,
) -> Result<BotConfig, ConfigError> {
    let mut settings: Settings = read_json(&layout.settings())?;
    if settings.token.trim().is_empty() {
        settings.token = env_token.unwrap_or_default();
    }
    if settings.token.trim().is_empty() {
        return Err(ConfigError::MissingToken);
    }

    let rules_path = layout.rules();
    let rules = if rules_path.exists() {
        read_json(&rules_path)?
    } else {
        tracing::debug!(path = %rules_path.display(), "No anti-spam rules configured");
        serde_json::Value::Null
    };

    let commands: CommandsFile = read_json(&layout.commands())?;
    let events: EventsFile = read_json(&layout.events())?;

    tracing::info!(
        commands = commands.command.len(),
        events = events.event.len(),
        prefix = %settings.prefix,
        "Configuration loaded"
    );

    Ok(BotConfig {
        settings,
        rules,
        commands: commands.command,
        events: events.event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write(path: PathBuf, value: serde_json::Value) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn seed(layout: &DataLayout, token: &str) {
        write(layout.settings(), json!({ "prefix": "?", "token": token }));
        write(
            layout.commands(),
            json!({ "command": [
                { "name": "ping", "perms": null, "actions": [ { "message": "pong" } ] }
            ]}),
        );
        write(
            layout.events(),
            json!({ "event": [
                { "name": "Any Message", "actions": [] }
            ]}),
        );
    }

    #[test]
    fn test_loads_full_layout() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        seed(&layout, "file-token");
        write(layout.rules(), json!({ "maxMessages": 5 }));

        let config = load_config_with_token(&layout, None).unwrap();

        assert_eq!(config.settings.prefix, "?");
        assert_eq!(config.settings.token, "file-token");
        assert_eq!(config.commands.len(), 1);
        assert!(config.commands[0].perms.is_empty());
        assert_eq!(config.events[0].name, "Any Message");
        assert_eq!(config.rules, json!({ "maxMessages": 5 }));
    }

    #[test]
    fn test_env_token_fills_empty_setting() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        seed(&layout, "");

        let config = load_config_with_token(&layout, Some("env-token".into())).unwrap();
        assert_eq!(config.settings.token, "env-token");
        assert_eq!(config.rules, serde_json::Value::Null);
    }

    #[test]
    fn test_file_token_wins_over_env() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        seed(&layout, "file-token");

        let config = load_config_with_token(&layout, Some("env-token".into())).unwrap();
        assert_eq!(config.settings.token, "file-token");
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        seed(&layout, "");

        assert!(matches!(
            load_config_with_token(&layout, None),
            Err(ConfigError::MissingToken)
        ));
    }

    #[test]
    fn test_unreadable_and_corrupt_files_are_reported() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        assert!(matches!(
            load_config_with_token(&layout, Some("t".into())),
            Err(ConfigError::Read { .. })
        ));

        seed(&layout, "t");
        std::fs::write(layout.commands(), "{ broken").unwrap();
        assert!(matches!(
            load_config_with_token(&layout, None),
            Err(ConfigError::Parse { .. })
        ));
    }
}
