use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = ".shockbot/config.toml";
const DEFAULT_DATA_DIR: &str = ".shockbot";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShockbotConfig {
    /// Directory holding `whitelist.json` and `wordlist.json`.
    pub data_dir: PathBuf,
    pub log_level: String,
    /// Dotenv file the credential commands append to.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub token: Option<String>,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            command_prefix: default_command_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// When set, `add` and `remove_word` are limited to whitelisted senders.
    #[serde(default)]
    pub word_commands_require_authorization: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_streaming_url")]
    pub streaming_url: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            streaming_url: default_streaming_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_api_base")]
    pub api_base: String,
    #[serde(default = "default_device_timeout_ms")]
    pub timeout_ms: u64,
    /// Reported to the device vendor as the operator of each shock.
    #[serde(default = "default_operator_name")]
    pub operator_name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            api_base: default_device_api_base(),
            timeout_ms: default_device_timeout_ms(),
            operator_name: default_operator_name(),
        }
    }
}

impl Default for ShockbotConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DATA_DIR);

        Self {
            data_dir,
            log_level: "info".to_string(),
            env_file: default_env_file(),
            discord: DiscordConfig::default(),
            policy: PolicyConfig::default(),
            presence: PresenceConfig::default(),
            device: DeviceConfig::default(),
        }
    }
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_command_prefix() -> String {
    ">".to_string()
}

fn default_streaming_url() -> String {
    "https://twitch.tv/meow".to_string()
}

fn default_device_api_base() -> String {
    "https://do.pishock.com".to_string()
}

fn default_device_timeout_ms() -> u64 {
    10_000
}

fn default_operator_name() -> String {
    "shockbot".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write config at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize default config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("config has invalid value: {0}")]
    ValidationFailed(String),
}

impl ShockbotConfig {
    pub fn resolve_path() -> PathBuf {
        if let Ok(path) = env::var("SHOCKBOT_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, raw).map_err(|source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn load_or_create_at(path: &Path) -> Result<(Self, bool), ConfigError> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }

        let cfg = Self::default();
        cfg.save(path)?;
        Ok((cfg, true))
    }

    pub fn load_or_create() -> Result<(Self, PathBuf, bool), ConfigError> {
        let path = Self::resolve_path();
        let (cfg, created) = Self::load_or_create_at(&path)?;
        Ok((cfg, path, created))
    }

    /// Token from `DISCORD_TOKEN` first, then the config file.
    pub fn discord_token(&self) -> Option<String> {
        env::var("DISCORD_TOKEN")
            .ok()
            .or_else(|| self.discord.token.clone())
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    pub fn validate_and_prepare(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "log_level cannot be empty".to_string(),
            ));
        }
        if self.discord.command_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "discord.command_prefix cannot be empty".to_string(),
            ));
        }
        if self.discord.command_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::ValidationFailed(
                "discord.command_prefix cannot contain whitespace".to_string(),
            ));
        }
        if self.device.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "device.api_base cannot be empty".to_string(),
            ));
        }
        if self.device.timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "device.timeout_ms must be positive".to_string(),
            ));
        }
        fs::create_dir_all(&self.data_dir).map_err(|source| ConfigError::WriteFailed {
            path: self.data_dir.clone(),
            source,
        })?;
        Ok(())
    }
}
