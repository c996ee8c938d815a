use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

pub const API_KEY_VAR: &str = "SHOCKER_APIKEY";
pub const DEVICE_CODE_VAR: &str = "SHOCKER_CODE";
pub const USERNAME_VAR: &str = "SHOCKER_USERNAME";

/// Device account settings. Any field may be missing until an admin sets it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub api_key: Option<String>,
    pub device_code: Option<String>,
    pub username: Option<String>,
}

/// Borrowed view that only exists when all three fields are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompleteCredentials<'a> {
    pub api_key: &'a str,
    pub device_code: &'a str,
    pub username: &'a str,
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("device_code", &self.device_code)
            .field("username", &self.username)
            .finish()
    }
}

impl RemoteCredentials {
    pub fn new(
        api_key: Option<String>,
        device_code: Option<String>,
        username: Option<String>,
    ) -> Self {
        Self {
            api_key: api_key.and_then(non_empty),
            device_code: device_code.and_then(non_empty),
            username: username.and_then(non_empty),
        }
    }

    /// Reads the three variables from the process environment.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(API_KEY_VAR).ok(),
            std::env::var(DEVICE_CODE_VAR).ok(),
            std::env::var(USERNAME_VAR).ok(),
        )
    }

    /// Reads a dotenv file. Later assignments win, matching append-only updates.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        let mut creds = Self::default();
        if !path.exists() {
            return Ok(creds);
        }
        let entries = dotenvy::from_path_iter(path)
            .with_context(|| format!("failed to open env file {}", path.display()))?;
        for entry in entries {
            let (key, value) =
                entry.with_context(|| format!("failed to parse env file {}", path.display()))?;
            creds.apply(&key, value);
        }
        Ok(creds)
    }

    /// Fields set in `other` replace ours; unset fields never clear anything.
    pub fn overlay(mut self, other: Self) -> Self {
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.device_code.is_some() {
            self.device_code = other.device_code;
        }
        if other.username.is_some() {
            self.username = other.username;
        }
        self
    }

    pub fn complete(&self) -> Option<CompleteCredentials<'_>> {
        Some(CompleteCredentials {
            api_key: self.api_key.as_deref()?,
            device_code: self.device_code.as_deref()?,
            username: self.username.as_deref()?,
        })
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("API key");
        }
        if self.device_code.is_none() {
            missing.push("code");
        }
        if self.username.is_none() {
            missing.push("username");
        }
        missing
    }

    fn apply(&mut self, key: &str, value: String) {
        let value = non_empty(value);
        if value.is_none() {
            return;
        }
        match key {
            API_KEY_VAR => self.api_key = value,
            DEVICE_CODE_VAR => self.device_code = value,
            USERNAME_VAR => self.username = value,
            _ => {}
        }
    }
}

/// Last value assigned to `key` in a dotenv file, if any.
pub fn env_file_value(path: &Path, key: &str) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to open env file {}", path.display()))?;
    let mut found = None;
    for entry in entries {
        let (name, value) =
            entry.with_context(|| format!("failed to parse env file {}", path.display()))?;
        if name == key {
            found = non_empty(value);
        }
    }
    Ok(found)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// In-memory credentials backed by an append-only dotenv file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    env_file: PathBuf,
    current: RemoteCredentials,
}

impl CredentialStore {
    pub fn new(env_file: PathBuf, current: RemoteCredentials) -> Self {
        Self { env_file, current }
    }

    /// File values first, then the process environment on top.
    pub fn load(env_file: PathBuf) -> Result<Self> {
        let from_file = match RemoteCredentials::from_env_file(&env_file) {
            Ok(creds) => creds,
            Err(err) => {
                warn!(path = %env_file.display(), error = %err, "ignoring unreadable env file");
                RemoteCredentials::default()
            }
        };
        let current = from_file.overlay(RemoteCredentials::from_env());
        Ok(Self::new(env_file, current))
    }

    pub fn env_file(&self) -> &Path {
        &self.env_file
    }

    pub fn current(&self) -> &RemoteCredentials {
        &self.current
    }

    pub fn set_device(&mut self, api_key: &str, device_code: &str) -> Result<()> {
        let api_key = validate_value(API_KEY_VAR, api_key)?;
        let device_code = validate_value(DEVICE_CODE_VAR, device_code)?;
        self.append(&[(API_KEY_VAR, &api_key), (DEVICE_CODE_VAR, &device_code)])?;
        self.current.api_key = Some(api_key);
        self.current.device_code = Some(device_code);
        info!("device api key and code updated");
        Ok(())
    }

    pub fn set_username(&mut self, username: &str) -> Result<()> {
        let username = validate_value(USERNAME_VAR, username)?;
        self.append(&[(USERNAME_VAR, &username)])?;
        self.current.username = Some(username);
        info!("device username updated");
        Ok(())
    }

    fn append(&self, pairs: &[(&str, &str)]) -> Result<()> {
        if let Some(parent) = self.env_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.env_file)
            .with_context(|| format!("failed to open {}", self.env_file.display()))?;
        let mut chunk = String::new();
        for (key, value) in pairs {
            chunk.push_str(&format!("{key}={value}\n"));
        }
        file.write_all(chunk.as_bytes())
            .with_context(|| format!("failed to append to {}", self.env_file.display()))?;
        Ok(())
    }
}

fn validate_value(key: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{key} cannot be empty");
    }
    if value.chars().any(|c| c.is_whitespace() || c == '#' || c == '"' || c == '\'') {
        bail!("{key} contains characters that cannot be stored");
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn complete_requires_all_three_fields() {
        let partial = RemoteCredentials::new(Some("key".into()), Some("code".into()), None);
        assert!(partial.complete().is_none());
        assert_eq!(partial.missing_fields(), vec!["username"]);

        let full = RemoteCredentials::new(
            Some("key".into()),
            Some("code".into()),
            Some("alice".into()),
        );
        let complete = full.complete().expect("complete");
        assert_eq!(complete.username, "alice");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let creds = RemoteCredentials::new(Some("  ".into()), None, Some(String::new()));
        assert_eq!(creds.missing_fields().len(), 3);
    }

    #[test]
    fn overlay_never_clears_fields() {
        let base = RemoteCredentials::new(Some("key".into()), Some("code".into()), None);
        let merged = base.overlay(RemoteCredentials::new(None, None, Some("bob".into())));
        assert_eq!(merged.api_key.as_deref(), Some("key"));
        assert_eq!(merged.username.as_deref(), Some("bob"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let creds = RemoteCredentials::new(Some("secret-key".into()), None, None);
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret-key"));
    }

    #[test]
    fn updates_are_appended_and_last_value_wins() {
        let tmp = tempdir().expect("tempdir");
        let env_file = tmp.path().join(".env");
        std::fs::write(&env_file, "DISCORD_TOKEN=abc\nSHOCKER_CODE=old\n").expect("seed");

        let mut store = CredentialStore::new(
            env_file.clone(),
            RemoteCredentials::from_env_file(&env_file).expect("read env"),
        );
        assert_eq!(store.current().device_code.as_deref(), Some("old"));

        store.set_device("key-1", "new").expect("set device");
        store.set_username("carol").expect("set username");

        let raw = std::fs::read_to_string(&env_file).expect("read env file");
        assert!(raw.starts_with("DISCORD_TOKEN=abc\n"));
        assert!(raw.ends_with("SHOCKER_APIKEY=key-1\nSHOCKER_CODE=new\nSHOCKER_USERNAME=carol\n"));

        let reread = RemoteCredentials::from_env_file(&env_file).expect("reread");
        assert_eq!(reread, store.current().clone());
    }

    #[test]
    fn env_file_value_returns_last_assignment() {
        let tmp = tempdir().expect("tempdir");
        let env_file = tmp.path().join(".env");
        std::fs::write(&env_file, "DISCORD_TOKEN=first\nOTHER=x\nDISCORD_TOKEN=second\n")
            .expect("seed");
        assert_eq!(
            env_file_value(&env_file, "DISCORD_TOKEN").expect("read"),
            Some("second".to_string())
        );
        assert_eq!(env_file_value(&env_file, "MISSING").expect("read"), None);
        assert_eq!(
            env_file_value(&tmp.path().join("absent.env"), "DISCORD_TOKEN").expect("read"),
            None
        );
    }

    #[test]
    fn values_with_whitespace_are_rejected() {
        let tmp = tempdir().expect("tempdir");
        let mut store = CredentialStore::new(tmp.path().join(".env"), RemoteCredentials::default());
        assert!(store.set_username("two words").is_err());
        assert!(!tmp.path().join(".env").exists());
    }
}
