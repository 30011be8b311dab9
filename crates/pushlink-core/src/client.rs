// ── Registration client ──
//
// Cloneable handle onto the control task. Every public operation becomes
// a message on the control queue; commands wait for the task to accept or
// reject them, never for the handshake to finish. Progress is observed
// through listeners or the status `watch` channel.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pushlink_api::TransactionExecutor;

use crate::command::{Command, CommandEnvelope, Message};
use crate::config::ClientSettings;
use crate::credentials::CredentialProvider;
use crate::error::CoreError;
use crate::listener::{ListenerId, RegistrationListener};
use crate::machine::{Collaborators, ControlTask, StatusSnapshot};
use crate::push::{PushEventSink, PushTransport};
use crate::status::RegistrationStatus;
use crate::store::ConfigStore;
use crate::strategy::RegistrationStrategy;

// ── Builder ──────────────────────────────────────────────────────────

/// Wires collaborators together and spawns the control task.
pub struct RegistrationClientBuilder {
    deps: Collaborators,
    listeners: Vec<(ListenerId, Arc<dyn RegistrationListener>)>,
}

impl RegistrationClientBuilder {
    /// Attach the backend-side completion step. Without one, a received
    /// registration id is treated as a completed registration.
    pub fn strategy(mut self, strategy: Arc<dyn RegistrationStrategy>) -> Self {
        self.deps.strategy = Some(strategy);
        self
    }

    /// Register a listener before the task starts, so it sees every
    /// transition from `initialize` on.
    pub fn listener(mut self, listener: Arc<dyn RegistrationListener>) -> Self {
        self.listeners.push((ListenerId::next(), listener));
        self
    }

    /// Spawn the control task on the current tokio runtime.
    pub fn spawn(self) -> RegistrationClient {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::default());
        let cancel = CancellationToken::new();

        let task = ControlTask::new(
            self.deps,
            self.listeners,
            tx.downgrade(),
            status_tx,
            cancel.clone(),
        );
        let handle = tokio::spawn(task.run(rx));

        RegistrationClient {
            inner: Arc::new(ClientInner {
                tx,
                status_rx,
                cancel,
                task: Mutex::new(Some(handle)),
            }),
        }
    }
}

// ── Client handle ────────────────────────────────────────────────────

/// Handle to a running registration engine.
///
/// Cheaply cloneable. Dropping the last handle stops the control task.
#[derive(Clone)]
pub struct RegistrationClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    tx: mpsc::UnboundedSender<Message>,
    status_rx: watch::Receiver<StatusSnapshot>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RegistrationClient {
    pub fn builder(
        settings: ClientSettings,
        store: Arc<dyn ConfigStore>,
        push: Arc<dyn PushTransport>,
        credentials: Arc<dyn CredentialProvider>,
        executor: Arc<TransactionExecutor>,
    ) -> RegistrationClientBuilder {
        RegistrationClientBuilder {
            deps: Collaborators {
                settings,
                store,
                push,
                credentials,
                executor,
                strategy: None,
            },
            listeners: Vec::new(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Load the persisted configuration. Must be the first command.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        self.execute(Command::Initialize).await
    }

    /// Start a registration cycle for `account_name`. Ignored if already
    /// registered.
    pub async fn register(&self, account_name: impl Into<String>) -> Result<(), CoreError> {
        self.execute(Command::Register {
            account_name: account_name.into(),
        })
        .await
    }

    /// Restart the handshake for the configured account.
    pub async fn reregister(&self) -> Result<(), CoreError> {
        self.execute(Command::Reregister).await
    }

    /// Drop the push registration. Ignored unless registered.
    pub async fn unregister(&self) -> Result<(), CoreError> {
        self.execute(Command::Unregister).await
    }

    /// Unregister if needed, then reset the account configuration.
    pub async fn clear(&self) -> Result<(), CoreError> {
        self.execute(Command::Clear).await
    }

    async fn execute(&self, command: Command) -> Result<(), CoreError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.inner
            .tx
            .send(Message::Command(CommandEnvelope {
                command,
                response_tx,
            }))
            .map_err(|_| CoreError::ClientStopped)?;
        response_rx.await.map_err(|_| CoreError::ClientStopped)?
    }

    // ── Listeners ────────────────────────────────────────────────────

    pub fn add_listener(&self, listener: Arc<dyn RegistrationListener>) -> ListenerId {
        let id = ListenerId::next();
        let _ = self.inner.tx.send(Message::AddListener(id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        let _ = self.inner.tx.send(Message::RemoveListener(id));
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.status_rx.clone()
    }

    /// Latest published status.
    pub fn status(&self) -> RegistrationStatus {
        self.inner.status_rx.borrow().status.clone()
    }

    /// Sink for feeding push transport events in from outside the
    /// transport callbacks (e.g. a platform receiver).
    pub fn push_sink(&self) -> PushEventSink {
        PushEventSink::new(self.inner.tx.downgrade())
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Stop the control task and cancel pending retry timers.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            if let Err(e) = handle.await {
                debug!(error = %e, "control task ended abnormally");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled() || self.inner.tx.is_closed()
    }
}
