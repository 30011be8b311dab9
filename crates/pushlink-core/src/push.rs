// ── Push transport seam ──
//
// The platform push service is an external collaborator. The engine asks
// it to start (un)registration; the transport answers later through the
// `PushEventSink` it was handed, which posts onto the control queue.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::debug;

use crate::command::Message;

/// Outcome of a push (un)registration request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PushResponse {
    pub registration_id: Option<String>,
    pub unregistered: bool,
    pub error: Option<String>,
}

impl PushResponse {
    pub fn registered(registration_id: impl Into<String>) -> Self {
        Self {
            registration_id: Some(registration_id.into()),
            ..Self::default()
        }
    }

    pub fn unregistered() -> Self {
        Self {
            unregistered: true,
            ..Self::default()
        }
    }

    pub fn error(code: impl Into<String>) -> Self {
        Self {
            error: Some(code.into()),
            ..Self::default()
        }
    }
}

/// A downstream message delivered by the push transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PushMessage {
    pub data: BTreeMap<String, String>,
}

/// Handle the push transport uses to report back to the engine.
///
/// Holds only a weak reference to the control queue: a sink kept around by
/// the transport does not keep a stopped client alive.
#[derive(Debug, Clone)]
pub struct PushEventSink {
    tx: mpsc::WeakUnboundedSender<Message>,
}

impl PushEventSink {
    pub(crate) fn new(tx: mpsc::WeakUnboundedSender<Message>) -> Self {
        Self { tx }
    }

    /// Deliver a (un)registration response. Returns `false` if the client
    /// has stopped.
    pub fn registration_response(&self, response: PushResponse) -> bool {
        self.post(Message::PushResponse(response))
    }

    /// Deliver a downstream message. Returns `false` if the client has
    /// stopped.
    pub fn message(&self, message: PushMessage) -> bool {
        self.post(Message::PushMessage(message))
    }

    fn post(&self, msg: Message) -> bool {
        let Some(tx) = self.tx.upgrade() else {
            debug!("push event dropped: client stopped");
            return false;
        };
        tx.send(msg).is_ok()
    }
}

/// Platform push-messaging service.
pub trait PushTransport: Send + Sync {
    /// Ask the platform to register this device for `sender_id`. Returns
    /// `false` if the push service is not available on this host.
    fn start_registration(&self, sender_id: &str, sink: PushEventSink) -> bool;

    /// Ask the platform to drop this device's registration.
    fn start_unregistration(&self, sink: PushEventSink) -> bool;
}
