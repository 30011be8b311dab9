// ── Registration configuration ──
//
// The persisted snapshot the state machine owns. Stored as a flat map of
// text/integer values so any key-value backend can hold it; the typed
// `RegistrationConfig` view is what the control task works with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::status::RegistrationStatus;

// ── Keys ─────────────────────────────────────────────────────────────

pub const KEY_ACCOUNT_NAME: &str = "accountName";
pub const KEY_ACCOUNT_TYPE: &str = "accountType";
pub const KEY_AUTH_TOKEN: &str = "authToken";
pub const KEY_REG_ID: &str = "regId";
pub const KEY_SENDER_ID: &str = "senderId";
pub const KEY_APP_NAME: &str = "appName";
pub const KEY_RESOURCE: &str = "resource";
pub const KEY_BACKOFF: &str = "backoff";
pub const KEY_LAST_CHANGE: &str = "lastChange";
pub const KEY_STATE: &str = "state";
pub const KEY_SUB_STATE: &str = "subState";

// ── Defaults ─────────────────────────────────────────────────────────

pub const DEFAULT_ACCOUNT_TYPE: &str = "com.google";
pub const DEFAULT_AUTHORITY: &str = "ah";
pub const DEFAULT_BACKOFF_MS: u64 = 30_000;
pub const MAX_BACKOFF_MS: u64 = 600_000;
const BACKOFF_MULTIPLIER: u64 = 2;

/// Push-transport error code that schedules a retry.
pub const SERVICE_NOT_AVAILABLE: &str = "SERVICE_NOT_AVAILABLE";

/// Backoff to persist after waiting `used` milliseconds.
pub fn next_backoff(used: u64) -> u64 {
    used.saturating_mul(BACKOFF_MULTIPLIER).min(MAX_BACKOFF_MS)
}

/// Delay before the next retry given the persisted backoff (0 = default).
pub fn effective_backoff(persisted: u64) -> u64 {
    if persisted == 0 {
        DEFAULT_BACKOFF_MS
    } else {
        persisted
    }
}

// ── Storage representation ───────────────────────────────────────────

/// A persisted configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Integer(i64),
    Text(String),
}

impl ConfigValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

pub type ConfigMap = BTreeMap<String, ConfigValue>;

// ── Host settings ────────────────────────────────────────────────────

/// Application-supplied settings that seed a fresh configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub app_name: String,
    pub sender_id: String,
    pub resource: String,
    pub account_type: String,
    /// Token scope requested from the credential provider.
    pub authority: String,
    /// Cookie the backend login endpoint sets.
    pub auth_cookie_name: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            sender_id: String::new(),
            resource: String::new(),
            account_type: DEFAULT_ACCOUNT_TYPE.to_owned(),
            authority: DEFAULT_AUTHORITY.to_owned(),
            auth_cookie_name: pushlink_api::DEFAULT_AUTH_COOKIE_NAME.to_owned(),
        }
    }
}

// ── Typed view ───────────────────────────────────────────────────────

/// Typed registration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrationConfig {
    pub account_name: String,
    pub account_type: String,
    pub auth_token: String,
    pub reg_id: String,
    pub sender_id: String,
    pub app_name: String,
    pub resource: String,
    /// Next retry delay in ms; 0 means "use the default".
    pub backoff_ms: u64,
    /// Epoch ms of the last push-transport response.
    pub last_change: i64,
    pub status: RegistrationStatus,
}

impl RegistrationConfig {
    /// Fresh configuration seeded from host settings.
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            account_type: settings.account_type.clone(),
            sender_id: settings.sender_id.clone(),
            app_name: settings.app_name.clone(),
            resource: settings.resource.clone(),
            ..Self::default()
        }
    }

    /// Overlay persisted values onto a seeded configuration.
    ///
    /// Unknown keys are ignored; a persisted status that does not parse
    /// leaves the status untouched.
    pub fn overlay(&mut self, map: &ConfigMap) {
        let text = |key: &str| map.get(key).and_then(ConfigValue::as_text);

        for (key, slot) in [
            (KEY_ACCOUNT_NAME, &mut self.account_name),
            (KEY_ACCOUNT_TYPE, &mut self.account_type),
            (KEY_AUTH_TOKEN, &mut self.auth_token),
            (KEY_REG_ID, &mut self.reg_id),
            (KEY_SENDER_ID, &mut self.sender_id),
            (KEY_APP_NAME, &mut self.app_name),
            (KEY_RESOURCE, &mut self.resource),
        ] {
            if let Some(v) = text(key) {
                v.clone_into(slot);
            }
        }

        if let Some(n) = map.get(KEY_BACKOFF).and_then(ConfigValue::as_integer) {
            self.backoff_ms = u64::try_from(n).unwrap_or(0);
        }
        if let Some(n) = map.get(KEY_LAST_CHANGE).and_then(ConfigValue::as_integer) {
            self.last_change = n;
        }
        if let (Some(state), Some(sub)) = (text(KEY_STATE), text(KEY_SUB_STATE)) {
            if let Some(status) = RegistrationStatus::from_parts(state, sub) {
                self.status = status;
            }
        }
    }

    /// Full snapshot for persistence.
    pub fn to_map(&self) -> ConfigMap {
        let mut map = ConfigMap::new();
        map.insert(KEY_ACCOUNT_NAME.into(), self.account_name.as_str().into());
        map.insert(KEY_ACCOUNT_TYPE.into(), self.account_type.as_str().into());
        map.insert(KEY_AUTH_TOKEN.into(), self.auth_token.as_str().into());
        map.insert(KEY_REG_ID.into(), self.reg_id.as_str().into());
        map.insert(KEY_SENDER_ID.into(), self.sender_id.as_str().into());
        map.insert(KEY_APP_NAME.into(), self.app_name.as_str().into());
        map.insert(KEY_RESOURCE.into(), self.resource.as_str().into());
        map.insert(
            KEY_BACKOFF.into(),
            i64::try_from(self.backoff_ms).unwrap_or(i64::MAX).into(),
        );
        map.insert(KEY_LAST_CHANGE.into(), self.last_change.into());
        map.insert(KEY_STATE.into(), self.status.state().to_string().into());
        map.insert(KEY_SUB_STATE.into(), self.status.substate().into());
        map
    }

    /// Reset the account-specific fields while keeping host settings.
    pub fn wipe(&mut self, settings: &ClientSettings) {
        *self = Self::from_settings(settings);
        self.status = RegistrationStatus::Unregistered;
    }
}
