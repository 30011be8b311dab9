// ── Configuration persistence ──
//
// Key-value persistence seam for the registration snapshot. The control
// task reads once at initialize and writes the whole snapshot after every
// mutation, so implementations only need whole-map load/save.

use std::sync::{Arc, Mutex};

use crate::config::ConfigMap;
use crate::error::CoreError;

/// Whole-snapshot persistence for [`RegistrationConfig`](crate::RegistrationConfig).
pub trait ConfigStore: Send + Sync {
    /// Load the persisted snapshot. An absent snapshot is an empty map.
    fn load_all(&self) -> Result<ConfigMap, CoreError>;

    /// Replace the persisted snapshot.
    fn save_all(&self, map: &ConfigMap) -> Result<(), CoreError>;

    /// Remove the persisted snapshot entirely.
    fn clear(&self) -> Result<(), CoreError>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    map: ConfigMap,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a snapshot (e.g. to simulate a restart).
    pub fn with_snapshot(map: ConfigMap) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner { map, saves: 0 })),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ConfigMap {
        self.lock().map.clone()
    }

    /// Number of `save_all` calls so far.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ConfigStore for MemoryStore {
    fn load_all(&self) -> Result<ConfigMap, CoreError> {
        Ok(self.snapshot())
    }

    fn save_all(&self, map: &ConfigMap) -> Result<(), CoreError> {
        let mut inner = self.lock();
        inner.map.clone_from(map);
        inner.saves += 1;
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        self.lock().map.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ConfigValue;

    #[test]
    fn clones_share_state_and_count_saves() {
        let store = MemoryStore::new();
        let other = store.clone();

        let mut map = ConfigMap::new();
        map.insert("regId".into(), ConfigValue::from("r1"));
        store.save_all(&map).unwrap();

        assert_eq!(other.load_all().unwrap(), map);
        assert_eq!(other.save_count(), 1);

        other.clear().unwrap();
        assert!(store.snapshot().is_empty());
    }
}
