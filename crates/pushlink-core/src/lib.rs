//! Device registration engine for pushlink.
//!
//! Takes a device from unregistered to registered with a push-notification
//! backend by chaining three external steps (account auth token, backend
//! session cookie, platform push registration) and then recording the
//! push registration id with the backend.
//!
//! - **[`RegistrationClient`]**: cloneable handle onto a single control
//!   task. Commands ([`initialize`](RegistrationClient::initialize),
//!   [`register`](RegistrationClient::register),
//!   [`unregister`](RegistrationClient::unregister),
//!   [`clear`](RegistrationClient::clear)) are queued FIFO; asynchronous
//!   completions re-enter the same queue.
//!
//! - **[`RegistrationStatus`]**: the `(state, substate)` pair as one enum,
//!   published to [`RegistrationListener`]s and a `watch` channel after
//!   every transition and persisted through a [`ConfigStore`].
//!
//! - **Collaborator seams**: [`PushTransport`], [`CredentialProvider`],
//!   [`RegistrationStrategy`]. [`DeviceRegistration`] is the backend
//!   strategy built on `pushlink_api::ResourceAdapter`.

mod command;
mod machine;

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod listener;
pub mod push;
pub mod status;
pub mod store;
pub mod strategy;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{RegistrationClient, RegistrationClientBuilder};
pub use config::{ClientSettings, ConfigMap, ConfigValue, RegistrationConfig};
pub use credentials::{CredentialProvider, LaunchRequest, StaticCredentials, TokenResult};
pub use error::CoreError;
pub use listener::{ListenerId, RegistrationListener};
pub use machine::StatusSnapshot;
pub use push::{PushEventSink, PushMessage, PushResponse, PushTransport};
pub use status::{ErrorCause, Progress, RegistrationStatus, State};
pub use store::{ConfigStore, MemoryStore};
pub use strategy::{DeviceRegistration, RegistrationStrategy};
