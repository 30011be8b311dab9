use thiserror::Error;

/// Top-level error type for the `pushlink-api` crate.
///
/// Only pre-flight and protocol failures are errors here. A request that
/// reaches the wire and comes back with a non-200 status is *not* an error:
/// the raw status is handed to the caller, which decides what it means.
/// `pushlink-core` maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Request construction ────────────────────────────────────────
    /// `base_url + "/" + path` did not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No session cookie is installed; anonymous calls are refused.
    #[error("No session credential -- complete the login exchange first")]
    MissingCredential,

    /// A record was addressed by its key field but does not carry it.
    #[error("Record has no '{field}' field")]
    MissingKey { field: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The login-redirect exchange did not yield the session cookie.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// TLS setup or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Body was not valid JSON, or was neither an object nor an array.
    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payload_message_omits_body() {
        let err = Error::MalformedPayload {
            message: "expected '{' or '['".into(),
            body: "secret body".into(),
        };
        assert_eq!(err.to_string(), "Malformed payload: expected '{' or '['");
    }
}
