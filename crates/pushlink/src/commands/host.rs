//! Host-side collaborators for the registration engine.
//!
//! A desktop host has no account manager and no platform push service:
//! the token comes from configuration and the registration id from the
//! command line.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use pushlink_api::{ResourceAdapter, TransactionExecutor};
use pushlink_config::FileStore;
use pushlink_core::{
    ConfigStore, CoreError, DeviceRegistration, LaunchRequest, Progress, PushEventSink,
    PushMessage, PushResponse, PushTransport, RegistrationClient, RegistrationListener,
    RegistrationStatus, StaticCredentials, StatusSnapshot, config::KEY_ACCOUNT_NAME,
};

use crate::config::Resolved;
use crate::error::CliError;

// ── Push transport ───────────────────────────────────────────────────

/// Answers registration with a caller-supplied id. Without one, reports
/// the push service as unavailable.
#[derive(Debug, Default)]
pub struct ManualPushTransport {
    reg_id: Option<String>,
}

impl ManualPushTransport {
    pub fn new(reg_id: Option<String>) -> Self {
        Self { reg_id }
    }
}

impl PushTransport for ManualPushTransport {
    fn start_registration(&self, sender_id: &str, sink: PushEventSink) -> bool {
        let Some(ref reg_id) = self.reg_id else {
            warn!("no registration id supplied; pass --reg-id");
            return false;
        };
        debug!(sender_id, "answering push registration");
        sink.registration_response(PushResponse::registered(reg_id.clone()))
    }

    fn start_unregistration(&self, sink: PushEventSink) -> bool {
        sink.registration_response(PushResponse::unregistered())
    }
}

// ── Listener ─────────────────────────────────────────────────────────

/// Echoes transitions to stderr and remembers launch requests.
#[derive(Debug, Default)]
pub struct ProgressListener {
    quiet: bool,
    launch: Mutex<Option<LaunchRequest>>,
}

impl ProgressListener {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            launch: Mutex::new(None),
        }
    }

    pub fn take_launch_request(&self) -> Option<LaunchRequest> {
        self.launch
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }
}

impl RegistrationListener for ProgressListener {
    fn on_registration_notification(&self, account_name: &str, status: &RegistrationStatus) {
        info!(account = account_name, %status, "registration status");
        if !self.quiet {
            eprintln!("  {status}");
        }
    }

    fn on_launch_request(&self, request: &LaunchRequest) {
        *self
            .launch
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(request.clone());
    }

    fn on_message(&self, message: &PushMessage) {
        info!(fields = message.data.len(), "push message received");
    }
}

// ── Engine assembly ──────────────────────────────────────────────────

/// A running engine plus the pieces the CLI still needs to touch.
pub struct Engine {
    pub client: RegistrationClient,
    pub executor: Arc<TransactionExecutor>,
    pub listener: Arc<ProgressListener>,
}

/// Account persisted by a previous run, if any.
pub fn persisted_account(store: &FileStore) -> Result<Option<String>, CliError> {
    let map = store.load_all()?;
    Ok(map
        .get(KEY_ACCOUNT_NAME)
        .and_then(|v| v.as_text())
        .filter(|name| !name.is_empty())
        .map(str::to_owned))
}

/// Wire the engine for one CLI invocation and load persisted state.
pub async fn start_engine(
    resolved: &Resolved,
    account_name: &str,
    token: SecretString,
    reg_id: Option<String>,
    quiet: bool,
) -> Result<Engine, CliError> {
    let executor = Arc::new(TransactionExecutor::new(
        resolved.base_url.clone(),
        &resolved.transport,
    )?);
    let listener = Arc::new(ProgressListener::new(quiet));

    let mut builder = RegistrationClient::builder(
        resolved.settings(),
        Arc::new(FileStore::for_profile(&resolved.name)),
        Arc::new(ManualPushTransport::new(reg_id)),
        Arc::new(StaticCredentials::new(account_name, token)),
        Arc::clone(&executor),
    )
    .listener(listener.clone());

    match resolved.profile.device_id {
        Some(ref dev_id) => {
            let resources = ResourceAdapter::new(Arc::clone(&executor));
            builder = builder.strategy(Arc::new(DeviceRegistration::new(resources, dev_id.clone())));
        }
        None => debug!("no device_id configured; registration id alone completes"),
    }

    let client = builder.spawn();
    client.initialize().await?;

    Ok(Engine {
        client,
        executor,
        listener,
    })
}

// ── Waiting ──────────────────────────────────────────────────────────

fn is_settled(status: &RegistrationStatus) -> bool {
    status.is_resting() || matches!(status, RegistrationStatus::Registering(Progress::PromptingUser))
}

/// Wait for the first settled status published after `rx` was last
/// marked seen.
pub async fn settle(
    rx: &mut watch::Receiver<StatusSnapshot>,
    wait_secs: u64,
) -> Result<RegistrationStatus, CliError> {
    let outcome = tokio::time::timeout(Duration::from_secs(wait_secs), async {
        loop {
            rx.changed()
                .await
                .map_err(|_| CliError::from(CoreError::ClientStopped))?;
            let status = rx.borrow_and_update().status.clone();
            if is_settled(&status) {
                return Ok(status);
            }
        }
    })
    .await;

    outcome.unwrap_or_else(|_| {
        Err(CliError::Timeout {
            seconds: wait_secs,
            status: rx.borrow().status.clone(),
        })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pushlink_core::ErrorCause;

    use super::*;

    #[test]
    fn prompting_counts_as_settled() {
        assert!(is_settled(&RegistrationStatus::Registering(
            Progress::PromptingUser
        )));
        assert!(is_settled(&RegistrationStatus::Error(ErrorCause::AuthCookie)));
        assert!(!is_settled(&RegistrationStatus::Registering(
            Progress::HaveAuthCookie
        )));
        assert!(!is_settled(&RegistrationStatus::Unregistering));
    }

    #[test]
    fn listener_keeps_last_launch_request() {
        let listener = ProgressListener::new(true);
        listener.on_launch_request(&LaunchRequest {
            account_name: "alice".into(),
            target: "https://accounts.example/grant".into(),
        });
        assert_eq!(
            listener.take_launch_request().unwrap().target,
            "https://accounts.example/grant"
        );
        assert!(listener.take_launch_request().is_none());
    }

    #[test]
    fn persisted_account_ignores_blank() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.toml"));
        assert_eq!(persisted_account(&store).unwrap(), None);

        let mut map = pushlink_core::ConfigMap::new();
        map.insert(KEY_ACCOUNT_NAME.into(), "".into());
        store.save_all(&map).unwrap();
        assert_eq!(persisted_account(&store).unwrap(), None);

        map.insert(KEY_ACCOUNT_NAME.into(), "alice".into());
        store.save_all(&map).unwrap();
        assert_eq!(persisted_account(&store).unwrap().as_deref(), Some("alice"));
    }
}
