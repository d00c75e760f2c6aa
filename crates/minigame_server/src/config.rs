//! Configuration management for the minigame server.
//!
//! Handles loading, validation, and CLI overrides of server configuration
//! from TOML files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_event_window_min() -> u64 {
    3_600
}

fn default_event_window_max() -> u64 {
    6_000
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
    /// Chat-completion client settings (the Magic Wish item)
    pub openai: OpenAiSettings,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Directory under which per-session world directories are created
    pub worlds_root: String,
    /// Name of the lobby world players return to between sessions
    pub lobby_world: String,
    /// Tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Lower bound of the random-event delay window, in ticks
    #[serde(default = "default_event_window_min")]
    pub event_window_min: u64,
    /// Upper bound of the random-event delay window, in ticks
    #[serde(default = "default_event_window_max")]
    pub event_window_max: u64,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
    /// Optional file path for log output (None means stdout only)
    pub file_path: Option<String>,
}

/// Chat-completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    /// Bearer token; an empty string disables wish granting
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                worlds_root: "worlds".to_string(),
                lobby_world: "lobby".to_string(),
                tick_interval_ms: default_tick_interval(),
                event_window_min: default_event_window_min(),
                event_window_max: default_event_window_max(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
                file_path: None,
            },
            openai: OpenAiSettings {
                api_key: String::new(),
                model: default_model(),
                timeout_secs: default_timeout_secs(),
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at
    /// the specified path and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration for consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.worlds_root.is_empty() {
            return Err("server.worlds_root must not be empty".to_string());
        }
        if self.server.lobby_world.is_empty() {
            return Err("server.lobby_world must not be empty".to_string());
        }
        if self.server.tick_interval_ms == 0 {
            return Err("server.tick_interval_ms must be greater than zero".to_string());
        }
        if self.server.event_window_min >= self.server.event_window_max {
            return Err(
                "server.event_window_min must be below server.event_window_max".to_string(),
            );
        }
        Ok(())
    }

    /// The configured random-event delay window.
    pub fn event_window(&self) -> std::ops::Range<u64> {
        self.server.event_window_min..self.server.event_window_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_and_validates() {
        let config = AppConfig::default();
        config.validate().unwrap();

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.server.tick_interval_ms, 50);
        assert_eq!(parsed.event_window(), 3_600..6_000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [server]
            worlds_root = "/srv/worlds"
            lobby_world = "hub"

            [logging]
            level = "debug"
            json_format = true

            [openai]
            api_key = "sk-test"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.server.tick_interval_ms, 50);
        assert_eq!(parsed.openai.model, "gpt-4o-mini");
        assert_eq!(parsed.openai.timeout_secs, 30);
    }

    #[test]
    fn inverted_event_window_is_rejected() {
        let mut config = AppConfig::default();
        config.server.event_window_min = 7_000;
        assert!(config.validate().is_err());
    }
}
