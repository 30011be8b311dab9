// ── Registration control task ──
//
// Single consumer of the control queue. Owns the configuration, status,
// session progress, backoff, generation counter, and listener list; no
// other task mutates any of it. Token fetches and retry timers run as
// spawned tasks that post their result back onto the queue. The cookie
// exchange and strategy calls are awaited inline, so later messages wait
// behind them.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use pushlink_api::TransactionExecutor;

use crate::command::{Command, Message};
use crate::config::{
    ClientSettings, RegistrationConfig, SERVICE_NOT_AVAILABLE, effective_backoff, next_backoff,
};
use crate::credentials::{CredentialProvider, TokenResult};
use crate::error::CoreError;
use crate::listener::{ListenerId, RegistrationListener};
use crate::push::{PushEventSink, PushMessage, PushResponse, PushTransport};
use crate::status::{ErrorCause, Progress, RegistrationStatus};
use crate::store::ConfigStore;
use crate::strategy::RegistrationStrategy;

/// What observers see on the status `watch` channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    pub account_name: String,
    pub status: RegistrationStatus,
}

pub(crate) struct Collaborators {
    pub settings: ClientSettings,
    pub store: Arc<dyn ConfigStore>,
    pub push: Arc<dyn PushTransport>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub executor: Arc<TransactionExecutor>,
    pub strategy: Option<Arc<dyn RegistrationStrategy>>,
}

pub(crate) struct ControlTask {
    deps: Collaborators,
    listeners: Vec<(ListenerId, Arc<dyn RegistrationListener>)>,
    config: RegistrationConfig,
    initialized: bool,
    need_invalidate: bool,
    pending_clear: bool,
    /// The push transport accepted an unregistration and has not answered.
    unregistering: bool,
    generation: u64,
    tx: mpsc::WeakUnboundedSender<Message>,
    status_tx: watch::Sender<StatusSnapshot>,
    cancel: CancellationToken,
}

impl ControlTask {
    pub(crate) fn new(
        deps: Collaborators,
        listeners: Vec<(ListenerId, Arc<dyn RegistrationListener>)>,
        tx: mpsc::WeakUnboundedSender<Message>,
        status_tx: watch::Sender<StatusSnapshot>,
        cancel: CancellationToken,
    ) -> Self {
        let config = RegistrationConfig::from_settings(&deps.settings);
        Self {
            deps,
            listeners,
            config,
            initialized: false,
            need_invalidate: false,
            pending_clear: false,
            unregistering: false,
            generation: 0,
            tx,
            status_tx,
            cancel,
        }
    }

    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    self.handle(msg).await;
                }
            }
        }
        debug!("registration control task stopped");
    }

    async fn handle(&mut self, msg: Message) {
        match msg {
            Message::Command(envelope) => {
                debug!(command = %envelope.command, "handling command");
                let result = self.handle_command(envelope.command);
                if let Err(ref e) = result {
                    warn!(error = %e, "command rejected");
                }
                let _ = envelope.response_tx.send(result);
            }
            Message::AddListener(id, listener) => self.listeners.push((id, listener)),
            Message::RemoveListener(id) => self.listeners.retain(|(lid, _)| *lid != id),
            Message::AuthToken { generation, result } => {
                if generation == self.generation {
                    self.on_auth_token(result).await;
                } else {
                    debug!(generation, current = self.generation, "discarding stale token result");
                }
            }
            Message::PushResponse(response) => self.on_push_response(response).await,
            Message::PushMessage(message) => self.on_push_message(&message),
            Message::RetryRegistration { generation } => {
                if generation == self.generation {
                    info!("retrying push registration");
                    self.start_push_registration();
                } else {
                    debug!(generation, current = self.generation, "discarding stale retry");
                }
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    fn handle_command(&mut self, command: Command) -> Result<(), CoreError> {
        match command {
            Command::Initialize => self.initialize(),
            _ if !self.initialized => Err(CoreError::NotInitialized),
            Command::Register { account_name } => self.register(account_name),
            Command::Reregister => self.reregister(),
            Command::Unregister => {
                self.unregister();
                Ok(())
            }
            Command::Clear => {
                self.clear();
                Ok(())
            }
        }
    }

    fn initialize(&mut self) -> Result<(), CoreError> {
        if self.initialized {
            return Err(CoreError::AlreadyInitialized);
        }

        let persisted = self.deps.store.load_all()?;
        self.config = RegistrationConfig::from_settings(&self.deps.settings);
        self.config.overlay(&persisted);

        // The session cookie lives in memory only, so an interrupted
        // handshake cannot be resumed.
        if !self.config.status.is_resting() {
            debug!(status = %self.config.status, "resuming interrupted status as unregistered");
            self.config.status = RegistrationStatus::Unregistered;
        }

        self.initialized = true;
        info!(
            account = %self.config.account_name,
            status = %self.config.status,
            "registration client initialized"
        );
        self.commit();
        Ok(())
    }

    fn register(&mut self, account_name: String) -> Result<(), CoreError> {
        if account_name.is_empty() {
            return Err(CoreError::InvalidAccountName);
        }
        if self.config.status.is_registered() {
            info!("already registered, ignoring register");
            return Ok(());
        }

        self.begin_cycle();
        self.need_invalidate = true;
        self.config.account_name = account_name;
        self.config.auth_token.clear();
        self.config.reg_id.clear();
        self.set_status(RegistrationStatus::Registering(Progress::None));

        self.request_auth_token();
        Ok(())
    }

    fn reregister(&mut self) -> Result<(), CoreError> {
        if self.config.account_name.is_empty() {
            return Err(CoreError::NoAccountSelected);
        }
        self.begin_cycle();
        self.request_auth_token();
        Ok(())
    }

    fn unregister(&mut self) {
        if !self.config.status.is_registered() {
            info!(status = %self.config.status, "not registered, ignoring unregister");
            return;
        }
        if self.unregistering {
            info!("unregistration already in flight, ignoring unregister");
            return;
        }
        self.start_push_unregistration();
    }

    fn clear(&mut self) {
        if self.config.status.is_registered() {
            self.pending_clear = true;
            if self.unregistering {
                info!("unregistration already in flight, clearing when it finishes");
            } else {
                self.start_push_unregistration();
            }
        } else {
            self.wipe();
        }
    }

    // ── Handshake step 1: auth token ─────────────────────────────────

    fn request_auth_token(&mut self) {
        let account_type = self.config.account_type.clone();
        let account_name = self.config.account_name.clone();

        let known = self.deps.credentials.accounts(&account_type);
        if !known.iter().any(|a| *a == account_name) {
            error!(account = %account_name, %account_type, "account not found");
            self.set_status(RegistrationStatus::Error(ErrorCause::AuthToken));
            return;
        }

        let Some(tx) = self.tx.upgrade() else { return };
        let credentials = Arc::clone(&self.deps.credentials);
        let authority = self.deps.settings.authority.clone();
        let generation = self.generation;

        debug!(account = %account_name, generation, "requesting auth token");
        tokio::spawn(async move {
            let result = credentials
                .get_token(&account_name, &account_type, &authority)
                .await;
            let _ = tx.send(Message::AuthToken { generation, result });
        });
    }

    async fn on_auth_token(&mut self, result: Result<TokenResult, CoreError>) {
        match result {
            Ok(TokenResult::UserInteractionRequired(request)) => {
                info!(account = %request.account_name, "user interaction required for auth token");
                self.set_status(RegistrationStatus::Registering(Progress::PromptingUser));
                for (_, listener) in &self.listeners {
                    listener.on_launch_request(&request);
                }
            }
            Ok(TokenResult::Token(token)) if self.need_invalidate => {
                // The provider may hand back a cached token the backend
                // already rejected; the first one of a cycle is discarded.
                self.need_invalidate = false;
                self.deps
                    .credentials
                    .invalidate_token(&self.config.account_type, &token);
                self.set_status(RegistrationStatus::Registering(
                    Progress::InvalidatedAuthToken,
                ));
                self.request_auth_token();
            }
            Ok(TokenResult::Token(token)) => {
                token.expose_secret().clone_into(&mut self.config.auth_token);
                self.set_status(RegistrationStatus::Registering(Progress::HaveAuthToken));
                self.fetch_auth_cookie(&token).await;
            }
            Err(e) => {
                error!(error = %e, "auth token request failed");
                self.set_status(RegistrationStatus::Error(ErrorCause::AuthToken));
            }
        }
    }

    // ── Handshake step 2: auth cookie ────────────────────────────────

    async fn fetch_auth_cookie(&mut self, token: &SecretString) {
        let cookie_name = &self.deps.settings.auth_cookie_name;
        match self.deps.executor.login(token, cookie_name).await {
            Ok(_) => {
                self.set_status(RegistrationStatus::Registering(Progress::HaveAuthCookie));
                self.start_push_registration();
            }
            Err(e) => {
                error!(error = %e, "auth cookie exchange failed");
                self.set_status(RegistrationStatus::Error(ErrorCause::AuthCookie));
            }
        }
    }

    // ── Handshake step 3: push registration ──────────────────────────

    fn start_push_registration(&mut self) {
        let sink = self.sink();
        if !self
            .deps
            .push
            .start_registration(&self.config.sender_id, sink)
        {
            error!("push service not available");
            self.set_status(RegistrationStatus::Error(ErrorCause::C2dmNotFound));
        }
    }

    fn start_push_unregistration(&mut self) {
        let sink = self.sink();
        if self.deps.push.start_unregistration(sink) {
            self.unregistering = true;
        } else {
            error!("push service not available");
            self.set_status(RegistrationStatus::Error(ErrorCause::C2dmNotFound));
            if self.pending_clear {
                self.wipe();
            }
        }
    }

    async fn on_push_response(&mut self, response: PushResponse) {
        self.config.last_change = chrono::Utc::now().timestamp_millis();
        self.unregistering = false;

        if response.unregistered {
            info!("push unregistration confirmed");
            self.config.reg_id.clear();
            self.set_status(RegistrationStatus::Unregistering);
            self.complete_unregistration().await;
        } else if let Some(code) = response.error {
            warn!(%code, "push registration failed");
            self.config.reg_id.clear();
            if code == SERVICE_NOT_AVAILABLE && !self.pending_clear {
                self.schedule_retry();
            }
            self.set_status(RegistrationStatus::Error(ErrorCause::Provider(code)));
            if self.pending_clear {
                self.wipe();
            }
        } else if let Some(reg_id) = response.registration_id.filter(|id| !id.is_empty()) {
            info!("push registration id received");
            self.config.reg_id = reg_id;
            self.config.backoff_ms = 0;
            self.set_status(RegistrationStatus::Registering(Progress::HaveRegId));
            self.complete_registration().await;
        } else {
            warn!("push response carried no registration id, error, or unregistration");
            self.commit();
        }
    }

    /// Arm a retry timer at the current backoff and persist the next one.
    fn schedule_retry(&mut self) {
        let delay = effective_backoff(self.config.backoff_ms);
        self.config.backoff_ms = next_backoff(delay);

        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        let generation = self.generation;

        info!(delay_ms = delay, "scheduling push registration retry");
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(Duration::from_millis(delay)) => {
                    if let Some(tx) = tx.upgrade() {
                        let _ = tx.send(Message::RetryRegistration { generation });
                    }
                }
            }
        });
    }

    // ── Completion ───────────────────────────────────────────────────

    async fn complete_registration(&mut self) {
        let outcome = match &self.deps.strategy {
            Some(strategy) => strategy.register(&self.config).await,
            None => Ok(()),
        };
        match outcome {
            Ok(()) => {
                info!(account = %self.config.account_name, "registered");
                self.set_status(RegistrationStatus::Registered);
            }
            Err(e) => {
                error!(error = %e, "backend registration failed");
                self.set_status(RegistrationStatus::Error(ErrorCause::Register));
            }
        }
    }

    async fn complete_unregistration(&mut self) {
        let outcome = match &self.deps.strategy {
            Some(strategy) => strategy.unregister(&self.config).await,
            None => Ok(()),
        };
        match outcome {
            Ok(()) => {
                info!(account = %self.config.account_name, "unregistered");
                self.config.reg_id.clear();
                self.set_status(RegistrationStatus::Unregistered);
            }
            Err(e) => {
                error!(error = %e, "backend unregistration failed");
                self.set_status(RegistrationStatus::Error(ErrorCause::Unregister));
            }
        }
        if self.pending_clear {
            self.wipe();
        }
    }

    // ── Messages ─────────────────────────────────────────────────────

    fn on_push_message(&self, message: &PushMessage) {
        debug!(fields = message.data.len(), "push message received");
        for (_, listener) in &self.listeners {
            listener.on_message(message);
        }
    }

    // ── State helpers ────────────────────────────────────────────────

    /// Start a new cycle: earlier token results and timers become stale
    /// and the old session cookie is dropped.
    fn begin_cycle(&mut self) {
        self.generation += 1;
        self.pending_clear = false;
        self.unregistering = false;
        self.deps.executor.session().clear();
    }

    fn wipe(&mut self) {
        info!("clearing registration configuration");
        self.begin_cycle();
        self.need_invalidate = false;
        self.config.wipe(&self.deps.settings);
        self.commit();
    }

    fn set_status(&mut self, status: RegistrationStatus) {
        debug!(from = %self.config.status, to = %status, "status transition");
        self.config.status = status;
        self.commit();
    }

    /// Persist the snapshot, then tell everyone about it.
    fn commit(&self) {
        if let Err(e) = self.deps.store.save_all(&self.config.to_map()) {
            error!(error = %e, "failed to persist registration configuration");
        }

        let account = self.config.account_name.as_str();
        let status = &self.config.status;
        for (_, listener) in &self.listeners {
            listener.on_registration_notification(account, status);
        }

        self.status_tx.send_replace(StatusSnapshot {
            account_name: account.to_owned(),
            status: status.clone(),
        });
    }

    fn sink(&self) -> PushEventSink {
        PushEventSink::new(self.tx.clone())
    }
}
