//! Async HTTP transaction layer for the pushlink registration backend.
//!
//! The backend is a cookie-authenticated REST service exposing four
//! collections (`device`, `user`, `publication`, `subscription`) whose
//! entities are flat, string-typed JSON objects.
//!
//! - [`TransactionExecutor`] sends one request per call, attaching the
//!   session cookie and running bodies through a [`Codec`].
//! - [`TransactionExecutor::login`] performs the login-redirect exchange
//!   that yields the session cookie.
//! - [`ResourceAdapter`] maps CRUD verbs onto collection paths.
//!
//! Non-200 responses are not errors at this layer: a [`Transaction`]
//! carries the raw status (or `-1` if no response arrived) and callers
//! interpret it.

pub mod adapter;
pub mod auth;
pub mod codec;
pub mod error;
pub mod login;
pub mod record;
pub mod transaction;
pub mod transport;

pub use adapter::{Collection, ResourceAdapter};
pub use auth::{DEFAULT_AUTH_COOKIE_NAME, Session, SessionCookie};
pub use codec::{Codec, JsonCodec, Payload};
pub use error::Error;
pub use record::Record;
pub use transaction::{Method, STATUS_TRANSPORT_FAILURE, Transaction, TransactionExecutor};
pub use transport::TransportConfig;
