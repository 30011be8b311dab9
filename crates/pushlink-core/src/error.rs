// ── Core error types ──
//
// Errors surfaced by the registration engine. Command rejections are
// returned to the caller; handshake failures never escape the control
// task and become ERROR transitions instead. The `From<pushlink_api::Error>`
// impl folds transport-layer failures into the same taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Command rejections ───────────────────────────────────────────
    #[error("Registration client is already initialized")]
    AlreadyInitialized,

    #[error("Registration client is not initialized -- call initialize() first")]
    NotInitialized,

    #[error("No account selected")]
    NoAccountSelected,

    #[error("Account name must not be empty")]
    InvalidAccountName,

    #[error("Registration client has stopped")]
    ClientStopped,

    // ── Handshake failures ───────────────────────────────────────────
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Push transport unavailable")]
    TransportUnavailable,

    #[error("Backend rejected the request: {code}")]
    Backend { code: String },

    #[error("Registration strategy failed: {message}")]
    Strategy { message: String },

    // ── Persistence ──────────────────────────────────────────────────
    #[error("Configuration store error: {message}")]
    Store { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<pushlink_api::Error> for CoreError {
    fn from(err: pushlink_api::Error) -> Self {
        match err {
            pushlink_api::Error::Authentication { message } => Self::Authentication { message },
            pushlink_api::Error::MissingCredential => Self::Authentication {
                message: "no session cookie".into(),
            },
            pushlink_api::Error::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                Self::TransportUnavailable
            }
            pushlink_api::Error::Transport(e) => Self::Protocol {
                message: e.to_string(),
            },
            pushlink_api::Error::Tls(message) => Self::Protocol { message },
            pushlink_api::Error::InvalidUrl(e) => Self::Protocol {
                message: format!("invalid URL: {e}"),
            },
            pushlink_api::Error::MissingKey { field } => Self::Protocol {
                message: format!("record has no '{field}' field"),
            },
            pushlink_api::Error::MalformedPayload { message, body: _ } => {
                Self::Protocol { message }
            }
        }
    }
}
