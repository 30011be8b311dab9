// ── Control queue messages ──
//
// Everything that touches registration state goes through one FIFO
// queue: host commands (with a oneshot reply) and asynchronous
// completions posted back by spawned work or the push transport.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::credentials::TokenResult;
use crate::error::CoreError;
use crate::listener::{ListenerId, RegistrationListener};
use crate::push::{PushMessage, PushResponse};

/// Host-issued commands.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Command {
    Initialize,
    Register { account_name: String },
    Reregister,
    Unregister,
    Clear,
}

/// A command plus the channel its acceptance result goes back on.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<(), CoreError>>,
}

/// One entry on the control queue.
pub(crate) enum Message {
    Command(CommandEnvelope),
    AddListener(ListenerId, Arc<dyn RegistrationListener>),
    RemoveListener(ListenerId),
    /// Token fetch finished for the cycle identified by `generation`.
    AuthToken {
        generation: u64,
        result: Result<TokenResult, CoreError>,
    },
    PushResponse(PushResponse),
    PushMessage(PushMessage),
    /// Backoff timer for the cycle identified by `generation` fired.
    RetryRegistration { generation: u64 },
}
