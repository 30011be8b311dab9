// ── Registration listeners ──

use std::sync::atomic::{AtomicU64, Ordering};

use crate::credentials::LaunchRequest;
use crate::push::PushMessage;
use crate::status::RegistrationStatus;

/// Observer of registration progress. Called on the control task, so
/// implementations must not block.
pub trait RegistrationListener: Send + Sync {
    fn on_registration_notification(&self, account_name: &str, status: &RegistrationStatus);

    fn on_launch_request(&self, _request: &LaunchRequest) {}

    fn on_message(&self, _message: &PushMessage) {}
}

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}
