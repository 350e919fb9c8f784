//! Shared configuration for wagate.
//!
//! TOML profiles, platform paths for the config file and stored tokens,
//! token storage backend selection (file or system keyring), and
//! translation to `wagate_core::GatewayConfig`. The CLI layers its
//! `GlobalOpts` flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use wagate_core::{
    CoreError, DEFAULT_API_BASE_URL, FileTokenStorage, GatewayConfig, TOKEN_STORAGE_KEY,
    TokenStorage,
};

/// Keyring service name all wagate secrets live under.
pub const KEYRING_SERVICE: &str = "wagate";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    /// Look up `name`, falling back to a stock profile for `default`.
    ///
    /// A fresh install has no profiles at all; the implicit `default`
    /// profile points at the local gateway so the CLI works out of the box.
    pub fn profile(&self, name: &str) -> Result<Profile, ConfigError> {
        match self.profiles.get(name) {
            Some(profile) => Ok(profile.clone()),
            None if name == "default" => Ok(Profile::default()),
            None => Err(ConfigError::ProfileNotFound { name: name.into() }),
        }
    }

    /// Profile names, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// Where a profile keeps its bearer token between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStore {
    /// A `token` file under the platform data directory.
    #[default]
    File,
    /// The system keyring.
    Keyring,
}

impl std::str::FromStr for TokenStore {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            other => Err(ConfigError::Validation {
                field: "token_store".into(),
                reason: format!("expected 'file' or 'keyring', got '{other}'"),
            }),
        }
    }
}

/// A named gateway profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL, including the `/api` prefix.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub token_store: TokenStore,

    /// Override timeout.
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token_store: TokenStore::default(),
            timeout: None,
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "wagate", "wagate")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "wagate", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Platform data directory for persisted state.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "wagate"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Directory holding the token file for `profile_name`.
pub fn token_dir(profile_name: &str) -> PathBuf {
    data_dir().join("profiles").join(profile_name)
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path`, layered over defaults and under `WAGATE_` env.
///
/// Nested keys use a double underscore: `WAGATE_DEFAULTS__TIMEOUT=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WAGATE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Keyring token storage ───────────────────────────────────────────

/// Token storage backed by the system keyring, one entry per profile.
#[derive(Debug, Clone)]
pub struct KeyringTokenStorage {
    account: String,
}

impl KeyringTokenStorage {
    pub fn for_profile(profile_name: &str) -> Self {
        Self {
            account: format!("{profile_name}/{TOKEN_STORAGE_KEY}"),
        }
    }

    /// Keyring account name, `<profile>/token`.
    pub fn account(&self) -> &str {
        &self.account
    }

    fn entry(&self) -> Result<keyring::Entry, CoreError> {
        keyring::Entry::new(KEYRING_SERVICE, &self.account).map_err(|e| keyring_error("open", &e))
    }
}

fn keyring_error(action: &str, err: &keyring::Error) -> CoreError {
    CoreError::Storage {
        message: format!("failed to {action} keyring entry: {err}"),
    }
}

impl TokenStorage for KeyringTokenStorage {
    fn load(&self) -> Result<Option<SecretString>, CoreError> {
        match self.entry()?.get_password() {
            Ok(token) if token.trim().is_empty() => Ok(None),
            Ok(token) => Ok(Some(SecretString::from(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error("read", &e)),
        }
    }

    fn store(&self, token: &SecretString) -> Result<(), CoreError> {
        self.entry()?
            .set_password(token.expose_secret())
            .map_err(|e| keyring_error("write", &e))?;
        debug!(account = %self.account, "token stored in keyring");
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error("delete", &e)),
        }
    }
}

// ── Translation to core types ───────────────────────────────────────

/// Token storage backend selected by the profile.
pub fn build_token_storage(profile: &Profile, profile_name: &str) -> Arc<dyn TokenStorage> {
    match profile.token_store {
        TokenStore::File => Arc::new(FileTokenStorage::in_dir(token_dir(profile_name))),
        TokenStore::Keyring => Arc::new(KeyringTokenStorage::for_profile(profile_name)),
    }
}

/// Parse and check an API base URL.
pub fn parse_api_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|e| ConfigError::Validation {
        field: "api_base_url".into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_base_url".into(),
            reason: format!("expected an http or https URL, got '{raw}'"),
        });
    }
    Ok(url)
}

/// Build a `GatewayConfig` from a profile, no CLI flag overrides.
pub fn profile_to_gateway_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::new(parse_api_base_url(&profile.api_base_url)?);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(config)
}
