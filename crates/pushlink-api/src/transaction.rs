// Transaction executor
//
// Wraps `reqwest::Client` with backend URL construction, session cookie
// injection, and codec-driven body handling. Each call produces one
// immutable `Transaction`; nothing here retries and nothing here decides
// whether a status code is a success. That policy belongs to the callers.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::Session;
use crate::codec::{Codec, JsonCodec, Payload};
use crate::error::Error;
use crate::record::Record;
use crate::transport::TransportConfig;

/// Status reported when the request never produced an HTTP response.
pub const STATUS_TRANSPORT_FAILURE: i32 = -1;

/// HTTP methods the backend understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// POST and PUT carry an encoded record; GET and DELETE carry nothing.
    pub fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
        }
    }
}

/// One completed request/response exchange.
#[derive(Debug, Clone)]
pub struct Transaction {
    method: Method,
    path: String,
    request_body: Option<Record>,
    status: Option<StatusCode>,
    response_body: Option<Payload>,
}

impl Transaction {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn request_body(&self) -> Option<&Record> {
        self.request_body.as_ref()
    }

    /// HTTP status, or `None` if the exchange failed below HTTP.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// HTTP status as an integer; [`STATUS_TRANSPORT_FAILURE`] on I/O failure.
    pub fn status_code(&self) -> i32 {
        self.status
            .map_or(STATUS_TRANSPORT_FAILURE, |s| i32::from(s.as_u16()))
    }

    pub fn is_ok(&self) -> bool {
        self.status == Some(StatusCode::OK)
    }

    /// Decoded body. Only ever present for HTTP 200.
    pub fn response_body(&self) -> Option<&Payload> {
        self.response_body.as_ref()
    }

    pub fn into_response_body(self) -> Option<Payload> {
        self.response_body
    }
}

/// Executes transactions against the backend's REST resources.
///
/// Every request carries the session cookie held in [`Session`]; without
/// one the executor refuses to send anything. Redirects are surfaced,
/// never followed.
pub struct TransactionExecutor<C: Codec = JsonCodec> {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
    codec: C,
}

impl TransactionExecutor<JsonCodec> {
    /// Create a JSON executor from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_codec(http, base_url, JsonCodec))
    }

    /// Create a JSON executor around a pre-built client.
    ///
    /// The client must not follow redirects; see
    /// [`TransportConfig::build_client`].
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self::with_codec(http, base_url, JsonCodec)
    }
}

impl<C: Codec> TransactionExecutor<C> {
    pub fn with_codec(http: reqwest::Client, base_url: Url, codec: C) -> Self {
        Self {
            http,
            base_url,
            session: Session::new(),
            codec,
        }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session slot shared with whoever performs the login.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The underlying HTTP client (for the login exchange).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Base URL without its trailing slash.
    pub(crate) fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{base}/{path}`.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let full = format!("{}/{}", self.base(), path.trim_start_matches('/'));
        Ok(Url::parse(&full)?)
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Build, send, and classify one request.
    ///
    /// Returns `Err` only for pre-flight failures (bad URL, no session).
    /// Transport failures come back as a transaction whose
    /// [`status_code`](Transaction::status_code) is `-1`; the cause is
    /// logged here.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Record>,
    ) -> Result<Transaction, Error> {
        let url = self.url(path)?;
        let cookie = self.session.current().ok_or(Error::MissingCredential)?;

        debug!("{method} {url}");

        let mime = self.codec.mime_type();
        let mut builder = self
            .http
            .request(method.into(), url)
            .header(COOKIE, cookie.header_value());

        if method.has_body() {
            let empty = Record::new();
            let encoded = self.codec.encode(body.unwrap_or(&empty))?;
            builder = builder.header(CONTENT_TYPE, mime).body(encoded);
        } else {
            builder = builder.header(ACCEPT, mime);
        }

        let mut txn = Transaction {
            method,
            path: path.to_owned(),
            request_body: body.cloned(),
            status: None,
            response_body: None,
        };

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, %method, path, "transport failure");
                return Ok(txn);
            }
        };

        let status = resp.status();
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, %method, path, "failed to read response body");
                return Ok(txn);
            }
        };

        txn.status = Some(status);
        if status == StatusCode::OK {
            match self.codec.decode(&bytes) {
                Ok(payload) => txn.response_body = Some(payload),
                Err(e) => warn!(error = %e, %method, path, "undecodable response body"),
            }
        } else {
            trace!(status = status.as_u16(), "non-200 response, body discarded");
        }

        debug!(status = txn.status_code(), "{method} {path} complete");
        Ok(txn)
    }
}
