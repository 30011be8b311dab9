use std::fmt;
use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};

/// Name of the cookie the backend's login endpoint hands out.
pub const DEFAULT_AUTH_COOKIE_NAME: &str = "SACSID";

/// The session credential obtained from the login-redirect exchange.
///
/// Lives in memory only. The value is a [`SecretString`] so it never shows
/// up in `Debug` output or logs.
#[derive(Clone)]
pub struct SessionCookie {
    name: String,
    value: SecretString,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: SecretString::from(value.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `Cookie` request header value: `name=value`.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value.expose_secret())
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Shared slot holding the current session cookie.
///
/// Cheaply cloneable. The registration state machine writes it after a
/// successful login and clears it when a new cycle starts; CRUD callers
/// read it on whatever task they run on.
#[derive(Debug, Clone, Default)]
pub struct Session {
    cookie: Arc<RwLock<Option<SessionCookie>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, cookie: SessionCookie) {
        *self.cookie.write().unwrap_or_else(|e| e.into_inner()) = Some(cookie);
    }

    pub fn clear(&self) {
        *self.cookie.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn current(&self) -> Option<SessionCookie> {
        self.cookie
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookie
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}
