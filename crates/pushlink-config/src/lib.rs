//! Shared configuration for pushlink hosts.
//!
//! TOML profiles, auth-token resolution (env + keyring + plaintext), the
//! on-disk registration state store, and translation to the engine's
//! `ClientSettings` / `TransportConfig`.

mod store;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use pushlink_api::{DEFAULT_AUTH_COOKIE_NAME, TransportConfig};
use pushlink_core::ClientSettings;
use pushlink_core::config::{DEFAULT_ACCOUNT_TYPE, DEFAULT_AUTHORITY};

pub use store::FileStore;

/// Keyring service name.
pub const KEYRING_SERVICE: &str = "pushlink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("no auth token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse state file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Backend application name; also the default host name.
    pub app_name: String,

    /// Backend base URL. Defaults to `https://{app_name}.appspot.com`.
    pub base_url: Option<String>,

    /// Push sender id the device registers for.
    #[serde(default)]
    pub sender_id: String,

    /// Free-form resource label sent with the device registration.
    #[serde(default)]
    pub resource: String,

    /// Account type the credential provider is queried for.
    pub account_type: Option<String>,

    /// Account to register with when none is given on the command line.
    pub account: Option<String>,

    /// Stable device id used as the `device` entity key.
    pub device_id: Option<String>,

    /// Environment variable name containing the auth token.
    pub auth_token_env: Option<String>,

    /// Auth token (plaintext; prefer keyring or env var).
    pub auth_token: Option<String>,

    /// Session cookie name set by the login endpoint.
    pub auth_cookie_name: Option<String>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,
}

impl Profile {
    /// Resolved backend base URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = match &self.base_url {
            Some(url) => url.clone(),
            None if self.app_name.is_empty() => {
                return Err(ConfigError::Validation {
                    field: "app_name".into(),
                    reason: "either app_name or base_url must be set".into(),
                });
            }
            None => format!("https://{}.appspot.com", self.app_name),
        };
        raw.parse().map_err(|e| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL '{raw}': {e}"),
        })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "pushlink", "pushlink")
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("pushlink");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding per-profile registration state.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Registration state file for a profile.
pub fn state_path(profile_name: &str) -> PathBuf {
    data_dir().join(format!("state-{profile_name}.toml"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, layered over defaults and under
/// `PUSHLINK_*` environment variables (`__` separates nesting levels).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PUSHLINK_").split("__"));

    Ok(figment.extract()?)
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

// ── Credential resolution ───────────────────────────────────────────

fn keyring_key(profile_name: &str) -> String {
    format!("{profile_name}/auth-token")
}

/// Resolve the account auth token from the credential chain.
///
/// 1. env var named by `auth_token_env`
/// 2. system keyring (`pushlink` / `{profile}/auth-token`)
/// 3. plaintext `auth_token`
pub fn resolve_auth_token(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.auth_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref token) = profile.auth_token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an auth token in the system keyring.
pub fn store_auth_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name))?;
    entry.set_password(token)?;
    Ok(())
}

// ── Translation to engine types ─────────────────────────────────────

/// Build engine `ClientSettings` from a profile.
pub fn profile_to_settings(profile: &Profile) -> ClientSettings {
    ClientSettings {
        app_name: profile.app_name.clone(),
        sender_id: profile.sender_id.clone(),
        resource: profile.resource.clone(),
        account_type: profile
            .account_type
            .clone()
            .unwrap_or_else(|| DEFAULT_ACCOUNT_TYPE.into()),
        authority: DEFAULT_AUTHORITY.into(),
        auth_cookie_name: profile
            .auth_cookie_name
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.into()),
    }
}

/// Build the HTTP transport config from a profile and global defaults.
pub fn profile_transport(profile: &Profile, defaults: &Defaults) -> TransportConfig {
    TransportConfig::default().with_timeout(Duration::from_secs(
        profile.timeout.unwrap_or(defaults.timeout),
    ))
}
