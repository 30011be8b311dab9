// ── Account credential seam ──

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::CoreError;

/// Request for the host to show UI so the user can grant token access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub account_name: String,
    /// Host-specific handle for the interaction (URL, activity name, ...).
    pub target: String,
}

/// Result of asking the provider for an auth token.
#[derive(Debug, Clone)]
pub enum TokenResult {
    Token(SecretString),
    UserInteractionRequired(LaunchRequest),
}

/// OS account manager (or whatever stands in for it on this host).
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Account names known for `account_type`.
    fn accounts(&self, account_type: &str) -> Vec<String>;

    async fn get_token(
        &self,
        account_name: &str,
        account_type: &str,
        authority: &str,
    ) -> Result<TokenResult, CoreError>;

    /// Tell the provider a cached token must not be handed out again.
    fn invalidate_token(&self, account_type: &str, token: &SecretString);
}

/// Provider backed by one pre-resolved token.
///
/// Knows a single account and always returns the same token. Suits hosts
/// where the token comes from configuration rather than an account
/// manager.
#[derive(Debug)]
pub struct StaticCredentials {
    account_name: String,
    token: SecretString,
    invalidations: AtomicUsize,
}

impl StaticCredentials {
    pub fn new(account_name: impl Into<String>, token: SecretString) -> Self {
        Self {
            account_name: account_name.into(),
            token,
            invalidations: AtomicUsize::new(0),
        }
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    fn accounts(&self, _account_type: &str) -> Vec<String> {
        vec![self.account_name.clone()]
    }

    async fn get_token(
        &self,
        account_name: &str,
        _account_type: &str,
        _authority: &str,
    ) -> Result<TokenResult, CoreError> {
        if account_name != self.account_name {
            return Err(CoreError::Authentication {
                message: format!("unknown account '{account_name}'"),
            });
        }
        Ok(TokenResult::Token(self.token.clone()))
    }

    fn invalidate_token(&self, _account_type: &str, _token: &SecretString) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }
}
