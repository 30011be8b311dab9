//! CLI error types with miette diagnostics.
//!
//! Maps config, engine, and transport errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use pushlink_config::ConfigError;
use pushlink_core::{CoreError, RegistrationStatus};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REGISTRATION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach backend at {url}")]
    #[diagnostic(
        code(pushlink::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             URL: {url}\n\
             Override it with --backend <url>"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(pushlink::auth_failed),
        help(
            "The backend did not accept the account token.\n\
             Store a fresh one with: pushlink config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No auth token configured for profile '{profile}'")]
    #[diagnostic(
        code(pushlink::no_credentials),
        help(
            "Store one with: pushlink config set-token\n\
             Or name an environment variable with: pushlink config set auth_token_env <VAR>"
        )
    )]
    NoCredentials { profile: String },

    #[error("No account given and profile '{profile}' has no default account")]
    #[diagnostic(
        code(pushlink::no_account),
        help("Pass the account name, or run: pushlink config set account <name>")
    )]
    NoAccount { profile: String },

    // ── Registration ─────────────────────────────────────────────────
    #[error("Registration ended in {status}")]
    #[diagnostic(
        code(pushlink::registration_failed),
        help("Run with -vv to see each handshake step.")
    )]
    RegistrationFailed { status: RegistrationStatus },

    #[error("Registration needs user interaction: {target}")]
    #[diagnostic(
        code(pushlink::interaction_required),
        help("Grant access for the account, then run: pushlink reregister")
    )]
    InteractionRequired { target: String },

    #[error("Registration engine error: {0}")]
    #[diagnostic(code(pushlink::engine))]
    Engine(CoreError),

    // ── Resources ────────────────────────────────────────────────────
    #[error("{collection} '{key}' not found")]
    #[diagnostic(
        code(pushlink::not_found),
        help("Run: pushlink resource list {collection}")
    )]
    NotFound { collection: String, key: String },

    #[error("{operation} on {collection} was rejected by the backend")]
    #[diagnostic(code(pushlink::rejected), help("Run with -vv to see the HTTP status."))]
    Rejected {
        operation: String,
        collection: String,
    },

    #[error("Backend returned an unusable response: {message}")]
    #[diagnostic(code(pushlink::malformed))]
    Malformed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pushlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(pushlink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: pushlink config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(pushlink::no_config),
        help(
            "Create one with: pushlink config init --app-name <app> --sender-id <id>\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(pushlink::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Handshake did not settle within {seconds}s (last status {status})")]
    #[diagnostic(
        code(pushlink::timeout),
        help("Increase the wait with --wait, or check backend responsiveness.")
    )]
    Timeout {
        seconds: u64,
        status: RegistrationStatus,
    },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    #[diagnostic(code(pushlink::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::RegistrationFailed { .. } | Self::InteractionRequired { .. } => {
                exit_code::REGISTRATION
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoAccount { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Authentication { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::InvalidAccountName => CliError::Validation {
                field: "account".into(),
                reason: "account name must not be empty".into(),
            },
            CoreError::NoAccountSelected => CliError::NoAccount {
                profile: "current".into(),
            },
            CoreError::TransportUnavailable => CliError::ConnectionFailed {
                url: "(backend)".into(),
                reason: "connection refused or timed out".into(),
            },
            other => CliError::Engine(other),
        }
    }
}

// ── pushlink_api::Error → CliError mapping ───────────────────────────

impl From<pushlink_api::Error> for CliError {
    fn from(err: pushlink_api::Error) -> Self {
        match err {
            pushlink_api::Error::Authentication { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            pushlink_api::Error::MissingCredential => CliError::AuthFailed {
                profile: "current".into(),
                message: "no session cookie".into(),
            },
            pushlink_api::Error::MissingKey { field } => CliError::Validation {
                field,
                reason: "required key field is missing".into(),
            },
            pushlink_api::Error::InvalidUrl(e) => CliError::Validation {
                field: "backend".into(),
                reason: e.to_string(),
            },
            pushlink_api::Error::Transport(e) => CliError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "(unknown)".into(), ToString::to_string),
                reason: e.to_string(),
            },
            pushlink_api::Error::Tls(reason) => CliError::ConnectionFailed {
                url: "(client setup)".into(),
                reason,
            },
            pushlink_api::Error::MalformedPayload { message, .. } => {
                CliError::Malformed { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pushlink_core::ErrorCause;

    use super::*;

    #[test]
    fn exit_codes_group_by_cause() {
        assert_eq!(
            CliError::from(ConfigError::NoCredentials {
                profile: "p".into()
            })
            .exit_code(),
            exit_code::AUTH
        );
        assert_eq!(
            CliError::RegistrationFailed {
                status: RegistrationStatus::Error(ErrorCause::AuthCookie)
            }
            .exit_code(),
            exit_code::REGISTRATION
        );
        assert_eq!(
            CliError::from(CoreError::InvalidAccountName).exit_code(),
            exit_code::USAGE
        );
        assert_eq!(
            CliError::from(CoreError::ClientStopped).exit_code(),
            exit_code::GENERAL
        );
    }

    #[test]
    fn missing_key_is_a_usage_error() {
        let err = CliError::from(pushlink_api::Error::MissingKey {
            field: "dev_id".into(),
        });
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "dev_id"));
    }
}
