//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chatify_agent::session::DEFAULT_TITLE_CHARS;

/// Environment variable consulted when no endpoint is configured
pub const ENDPOINT_ENV: &str = "CHATIFY_ENDPOINT";
/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "CHATIFY_API_KEY";

/// Configuration for chatify
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat completions endpoint URL
    pub endpoint: Option<String>,
    /// Bearer token sent with every request
    pub api_key: Option<String>,
    /// Model name included in the request body
    pub model: Option<String>,
    /// User id owning stored conversations; unset means nothing is saved
    pub user: Option<String>,
    /// Total request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Length of titles derived from the first message
    pub title_max_chars: Option<usize>,
}

/// Values given on the command line, which win over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub user: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub user: Option<String>,
    pub timeout: Option<Duration>,
    pub title_max_chars: usize,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatify")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CHATIFY_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            timeout_secs: Some(300),
            title_max_chars: Some(DEFAULT_TITLE_CHARS),
            ..Config::default()
        };

        default_config.save()?;
        Ok(path)
    }

    /// The user owning stored conversations, if any
    pub fn resolve_user(&self, cli: Option<String>) -> Option<String> {
        cli.or_else(|| self.user.clone())
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
    }

    /// Merge command line values, this file and the environment.
    ///
    /// `env` looks up an environment variable by name.
    pub fn resolve(
        &self,
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Settings> {
        let endpoint = overrides
            .endpoint
            .or_else(|| self.endpoint.clone())
            .or_else(|| env(ENDPOINT_ENV))
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No endpoint configured. Pass --endpoint, set {} or add `endpoint` to {}",
                    ENDPOINT_ENV,
                    Self::config_path().display()
                )
            })?;

        let api_key = overrides
            .api_key
            .or_else(|| self.api_key.clone())
            .or_else(|| env(API_KEY_ENV))
            .filter(|k| !k.is_empty());

        Ok(Settings {
            endpoint,
            api_key,
            model: overrides.model.or_else(|| self.model.clone()),
            user: self.resolve_user(overrides.user),
            timeout: self.timeout_secs.map(Duration::from_secs),
            title_max_chars: self.title_max_chars.unwrap_or(DEFAULT_TITLE_CHARS),
        })
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# chatify configuration file
# Place at ~/.config/chatify/config.toml (Linux/Mac) or %APPDATA%\chatify\config.toml (Windows)

# Chat completions endpoint (can also use CHATIFY_ENDPOINT)
# endpoint = "https://example.com/functions/v1/chat"

# Bearer token (can also use CHATIFY_API_KEY)
# api_key = "..."

# Model name to include in requests (optional)
# model = "gpt-4o-mini"

# User id for saved conversations. Without it every chat is ephemeral.
# user = "me"

# Total request timeout in seconds, including the streamed reply
timeout_secs = 300

# Conversation titles are the first message, cut to this many characters
title_max_chars = 50
"#
}
