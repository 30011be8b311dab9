// ── Push-registration strategy ──
//
// Final step of the handshake: tell the backend about the device's push
// registration id (or remove it). Runs inline on the control task with
// the full configuration snapshot.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use tracing::{debug, warn};

use pushlink_api::{Collection, Method, Record, ResourceAdapter};

use crate::config::RegistrationConfig;
use crate::error::CoreError;

/// Device type reported to the backend.
pub const DEVICE_TYPE: &str = "gcm";

/// Backend-side completion of a push (un)registration.
#[async_trait]
pub trait RegistrationStrategy: Send + Sync {
    async fn register(&self, config: &RegistrationConfig) -> Result<(), CoreError>;

    async fn unregister(&self, config: &RegistrationConfig) -> Result<(), CoreError>;
}

/// Registers the device as a `device` entity keyed by a stable device id.
pub struct DeviceRegistration {
    resources: ResourceAdapter,
    dev_id: String,
    device: ArcSwapOption<Record>,
    user_id: ArcSwapOption<String>,
}

impl DeviceRegistration {
    pub fn new(resources: ResourceAdapter, dev_id: impl Into<String>) -> Self {
        Self {
            resources,
            dev_id: dev_id.into(),
            device: ArcSwapOption::empty(),
            user_id: ArcSwapOption::empty(),
        }
    }

    pub fn dev_id(&self) -> &str {
        &self.dev_id
    }

    /// Device entity returned by the last successful registration.
    pub fn device(&self) -> Option<Arc<Record>> {
        self.device.load_full()
    }

    /// Owning user reported by the last successful registration.
    pub fn user_id(&self) -> Option<Arc<String>> {
        self.user_id.load_full()
    }

    fn device_path(&self) -> String {
        format!("{}/{}/", Collection::Device.name(), self.dev_id)
    }
}

#[async_trait]
impl RegistrationStrategy for DeviceRegistration {
    async fn register(&self, config: &RegistrationConfig) -> Result<(), CoreError> {
        let body = Record::new()
            .with("name", &config.app_name)
            .with("resource", &config.resource)
            .with("type", DEVICE_TYPE)
            .with("reg_id", &config.reg_id)
            .with(Collection::Device.key_field(), &self.dev_id);

        let txn = self
            .resources
            .executor()
            .execute(Method::Put, &self.device_path(), Some(&body))
            .await?;

        debug!(status = txn.status_code(), dev_id = %self.dev_id, "device registration complete");
        if !txn.is_ok() {
            return Err(CoreError::Strategy {
                message: format!("device update answered {}", txn.status_code()),
            });
        }

        match txn.into_response_body().and_then(|p| p.into_object()) {
            Some(device) => {
                self.user_id
                    .store(device.get("user_id").map(|u| Arc::new(u.to_owned())));
                self.device.store(Some(Arc::new(device)));
            }
            None => warn!(dev_id = %self.dev_id, "device registration returned no entity"),
        }
        Ok(())
    }

    async fn unregister(&self, _config: &RegistrationConfig) -> Result<(), CoreError> {
        let removed = self
            .resources
            .delete(Collection::Device, &self.dev_id)
            .await?;
        if removed {
            self.device.store(None);
            self.user_id.store(None);
            Ok(())
        } else {
            Err(CoreError::Strategy {
                message: format!("device {} delete rejected", self.dev_id),
            })
        }
    }
}
