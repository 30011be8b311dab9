// Shared transport configuration for building reqwest::Client instances.
//
// Both the transaction executor and the login exchange build their
// client here so timeout, user agent, and the redirect policy stay in
// one place.

use std::time::Duration;

use reqwest::redirect;

const USER_AGENT: &str = concat!("pushlink/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_owned(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// Redirects are never followed: the login exchange must observe the
    /// 302 itself, and resource calls surface 3xx to the caller. No cookie
    /// store is attached; the session cookie is sent explicitly.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
